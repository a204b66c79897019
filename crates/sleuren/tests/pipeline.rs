// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sleuren::{
	BeforeSubmit, CapturedError, Context, ErrorReport, ExtraParameters, MessageLevel, ReportPayload, Result,
	SleurenClient, SleurenClientBuilder, SleurenError, Solution, SolutionProvider, StackFrame,
	StackTraceProducer, Transport,
};

#[derive(Clone, Default)]
struct RecordingTransport {
	payloads: Arc<Mutex<Vec<ReportPayload>>>,
}

impl RecordingTransport {
	fn payloads(&self) -> Vec<ReportPayload> {
		self.payloads.lock().unwrap().clone()
	}
}

impl Transport for RecordingTransport {
	fn submit(&self, payload: ReportPayload) {
		self.payloads.lock().unwrap().push(payload);
	}
}

#[derive(Clone, Default)]
struct CountingProducer {
	calls: Arc<AtomicUsize>,
	empty: bool,
}

#[async_trait]
impl StackTraceProducer for CountingProducer {
	async fn produce(&self, _: &CapturedError) -> Result<Vec<StackFrame>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.empty {
			return Ok(Vec::new());
		}
		Ok(vec![StackFrame {
			line_number: 42,
			column_number: 9,
			method: "process".into(),
			file: "./src/handlers.rs".into(),
			code_snippet: BTreeMap::from([(42, "do_work()?;".to_string())]),
			trimmed_column_number: None,
			class: "my_app::handlers".into(),
		}])
	}
}

enum Behaviour {
	Solve(&'static str),
	Decline,
	Fail,
	Panic,
}

struct TestProvider(Behaviour);

#[async_trait]
impl SolutionProvider for TestProvider {
	async fn can_solve(&self, _: &CapturedError, _: &ExtraParameters) -> Result<bool> {
		match self.0 {
			Behaviour::Solve(_) => Ok(true),
			Behaviour::Decline => Ok(false),
			Behaviour::Fail => Err(SleurenError::solution_provider("test", "unavailable")),
			Behaviour::Panic => panic!("provider exploded"),
		}
	}

	async fn get_solutions(&self, _: &CapturedError, _: &ExtraParameters) -> Result<Vec<Solution>> {
		match self.0 {
			Behaviour::Solve(title) => Ok(vec![Solution::new("Test", title, "try this")]),
			_ => Ok(Vec::new()),
		}
	}
}

#[derive(Clone, Default)]
struct CountingProvider {
	can_solve_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SolutionProvider for CountingProvider {
	async fn can_solve(&self, _: &CapturedError, _: &ExtraParameters) -> Result<bool> {
		self.can_solve_calls.fetch_add(1, Ordering::SeqCst);
		Ok(true)
	}

	async fn get_solutions(&self, _: &CapturedError, _: &ExtraParameters) -> Result<Vec<Solution>> {
		Ok(Vec::new())
	}
}

/// Returns the same frames for every error.
struct FixedFramesProducer(Vec<(&'static str, &'static str)>);

#[async_trait]
impl StackTraceProducer for FixedFramesProducer {
	async fn produce(&self, _: &CapturedError) -> Result<Vec<StackFrame>> {
		Ok(self
			.0
			.iter()
			.map(|(class, method)| StackFrame {
				line_number: 1,
				column_number: 1,
				method: method.to_string(),
				file: "src/main.rs".into(),
				code_snippet: BTreeMap::new(),
				trimmed_column_number: None,
				class: class.to_string(),
			})
			.collect())
	}
}

struct SlowSubmit;

#[async_trait]
impl BeforeSubmit for SlowSubmit {
	async fn before_submit(&self, report: ErrorReport) -> Option<ErrorReport> {
		tokio::time::sleep(Duration::from_millis(20)).await;
		Some(report)
	}
}

fn methods(report: &ErrorReport) -> Vec<&str> {
	report.stacktrace.iter().map(|f| f.method.as_str()).collect()
}

fn builder(transport: &RecordingTransport, producer: &CountingProducer) -> SleurenClientBuilder {
	SleurenClient::builder()
		.key("project-key")
		.stage("testing")
		.transport(transport.clone())
		.stack_trace_producer(producer.clone())
}

fn setup() -> (SleurenClient, RecordingTransport, CountingProducer) {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer).build().unwrap();
	(client, transport, producer)
}

fn error(message: &str) -> CapturedError {
	CapturedError::new("TypeError", message)
}

#[tokio::test]
async fn report_dispatches_an_enriched_payload() {
	let (client, transport, _) = setup();
	client.glow("clicked save", MessageLevel::Info, vec![json!({"id": 7})]).await;

	client.report(error("undefined is not a function")).await;

	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 1);

	let payload = &payloads[0];
	assert_eq!(payload.project, "project-key");
	assert_eq!(payload.report.exception_class, "TypeError");
	assert_eq!(payload.report.message, "undefined is not a function");
	assert_eq!(payload.report.language, "rust");
	assert_eq!(payload.report.stage.as_deref(), Some("testing"));
	assert_eq!(payload.report.stacktrace.len(), 1);
	assert_eq!(payload.report.glows.len(), 1);
	assert_eq!(payload.report.glows[0].name, "clicked save");
	assert!(payload.report.seen_at > 0);
}

#[tokio::test]
async fn before_evaluate_veto_skips_all_work() {
	let (client, transport, producer) = setup();
	let provider = CountingProvider::default();
	client.register_solution_provider(provider.clone()).await;
	client
		.set_before_evaluate(|e: CapturedError| (e.class() != "TypeError").then_some(e))
		.await;

	client.report(error("ignored")).await;

	assert!(transport.payloads().is_empty());
	assert_eq!(producer.calls.load(Ordering::SeqCst), 0);
	assert_eq!(provider.can_solve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn before_evaluate_can_rewrite_the_error() {
	let (client, transport, _) = setup();
	client
		.set_before_evaluate(|e: CapturedError| Some(e.with_message("rewritten")))
		.await;

	client.report(error("original")).await;

	assert_eq!(transport.payloads()[0].report.message, "rewritten");
}

#[tokio::test]
async fn before_submit_result_is_what_gets_sent() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer)
		.max_reports_per_minute(1)
		.before_submit(|mut report: ErrorReport| {
			report.message = "[redacted]".into();
			Some(report)
		})
		.build()
		.unwrap();

	client.report(error("password=hunter2")).await;
	client.report(error("second")).await;

	// The rewritten report still counted against the per-minute budget.
	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 1);
	assert_eq!(payloads[0].report.message, "[redacted]");
}

#[tokio::test]
async fn vetoed_reports_do_not_consume_the_rate_budget() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer)
		.max_reports_per_minute(1)
		.before_submit(|_: ErrorReport| -> Option<ErrorReport> { None })
		.build()
		.unwrap();

	client.report(error("vetoed")).await;
	assert!(transport.payloads().is_empty());

	client.set_before_submit(|r: ErrorReport| Some(r)).await;
	client.report(error("sent")).await;

	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 1);
	assert_eq!(payloads[0].report.message, "sent");
}

#[tokio::test]
async fn reports_beyond_the_per_minute_cap_are_dropped() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer)
		.max_reports_per_minute(2)
		.build()
		.unwrap();

	for i in 0..5 {
		client.report(error(&format!("error {i}"))).await;
	}

	let messages: Vec<String> = transport
		.payloads()
		.into_iter()
		.map(|p| p.report.message)
		.collect();
	assert_eq!(messages, vec!["error 0", "error 1"]);
}

#[tokio::test]
async fn missing_key_means_nothing_is_dispatched() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = SleurenClient::builder()
		.key("")
		.transport(transport.clone())
		.stack_trace_producer(producer.clone())
		.build()
		.unwrap();

	client.report(error("lost")).await;
	assert!(transport.payloads().is_empty());

	client.light("late-key", false).await;
	client.report(error("found")).await;

	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 1);
	assert_eq!(payloads[0].project, "late-key");
}

#[tokio::test]
async fn persistent_context_wins_over_ad_hoc_and_collectors() {
	let (client, transport, _) = setup();
	client
		.register_context_collector(|| {
			let mut context = Context::new();
			context.insert("shared".into(), json!("collector"));
			context.insert("request".into(), json!({"url": "https://app.test/"}));
			context
		})
		.await;
	client.add_context_group("shared", json!("persistent")).await;
	client.add_context("tenant", json!("acme")).await;

	let mut ad_hoc = Context::new();
	ad_hoc.insert("shared".into(), json!("ad hoc"));
	ad_hoc.insert("job".into(), json!({"id": 3}));

	client
		.report_with(error("boom"), ad_hoc, ExtraParameters::new())
		.await;

	let payloads = transport.payloads();
	let context = &payloads[0].report.context;
	assert_eq!(context["shared"], "persistent");
	assert_eq!(context["request"]["url"], "https://app.test/");
	assert_eq!(context["job"]["id"], 3);
	assert_eq!(context["context"]["tenant"], "acme");
}

#[tokio::test]
async fn solutions_are_attached_in_registration_order() {
	let (client, transport, _) = setup();
	client
		.register_solution_provider(TestProvider(Behaviour::Solve("first")))
		.await;
	client
		.register_solution_provider(TestProvider(Behaviour::Decline))
		.await;
	client
		.register_solution_provider(TestProvider(Behaviour::Solve("second")))
		.await;

	client.report(error("boom")).await;

	let titles: Vec<String> = transport.payloads()[0]
		.report
		.solutions
		.iter()
		.map(|s| s.title.clone())
		.collect();
	assert_eq!(titles, vec!["first", "second"]);
}

#[tokio::test]
async fn failing_provider_skips_the_report() {
	let (client, transport, _) = setup();
	client
		.register_solution_provider(TestProvider(Behaviour::Fail))
		.await;

	client.report(error("boom")).await;

	assert!(transport.payloads().is_empty());
}

#[tokio::test]
async fn panicking_provider_is_contained() {
	let (client, transport, _) = setup();
	client
		.register_solution_provider(TestProvider(Behaviour::Panic))
		.await;

	client.report(error("boom")).await;
	assert!(transport.payloads().is_empty());

	// The client stays usable afterwards.
	client.report_message("still alive").await;
	assert_eq!(transport.payloads().len(), 1);
}

#[tokio::test]
async fn report_message_skips_solutions_and_evaluate_hook() {
	let (client, transport, _) = setup();
	client
		.register_solution_provider(TestProvider(Behaviour::Solve("unused")))
		.await;
	client.set_before_evaluate(|_: CapturedError| -> Option<CapturedError> { None }).await;

	client.report_message("cache rebuilt").await;
	client
		.report_message_with("queue stalled", Context::new(), "Warning")
		.await;

	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 2);
	assert_eq!(payloads[0].report.exception_class, "Log");
	assert_eq!(payloads[0].report.message, "cache rebuilt");
	assert!(payloads[0].report.solutions.is_empty());
	assert_eq!(payloads[1].report.exception_class, "Warning");
}

#[tokio::test]
async fn glows_are_bounded_per_report() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer)
		.max_glows_per_report(2)
		.build()
		.unwrap();

	for name in ["one", "two", "three"] {
		client.glow(name, MessageLevel::Debug, Vec::new()).await;
	}
	client.report(error("boom")).await;

	let names: Vec<String> = transport.payloads()[0]
		.report
		.glows
		.iter()
		.map(|g| g.name.clone())
		.collect();
	assert_eq!(names, vec!["two", "three"]);

	client.clear_glows().await;
	client.report(error("again")).await;
	assert!(transport.payloads()[1].report.glows.is_empty());
}

#[tokio::test]
async fn empty_stack_trace_still_reports() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer {
		empty: true,
		..CountingProducer::default()
	};
	let client = builder(&transport, &producer).debug(true).build().unwrap();

	client.report(error("no frames")).await;

	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 1);
	assert!(payloads[0].report.stacktrace.is_empty());
}

#[tokio::test]
async fn spawn_report_runs_in_the_background() {
	let (client, transport, _) = setup();

	client.spawn_report(error("later")).await.unwrap();

	assert_eq!(transport.payloads()[0].report.message, "later");
}

#[tokio::test]
async fn test_report_announces_setup() {
	let (client, transport, _) = setup();

	client.test().await;

	assert_eq!(
		transport.payloads()[0].report.message,
		"The Sleuren client is set up correctly!"
	);
}

#[tokio::test]
async fn create_report_does_not_submit() {
	let (client, transport, _) = setup();

	let report = client
		.create_report(&error("draft"), &Context::new(), &ExtraParameters::new())
		.await
		.unwrap();
	assert!(transport.payloads().is_empty());

	client.send_report(report).await;
	assert_eq!(transport.payloads()[0].report.message, "draft");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_pipelines_respect_the_rate_limit() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer)
		.max_reports_per_minute(1)
		.before_submit(SlowSubmit)
		.build()
		.unwrap();

	let handles: Vec<_> = (0..5)
		.map(|i| client.spawn_report(error(&format!("concurrent {i}"))))
		.collect();
	for handle in handles {
		handle.await.unwrap();
	}

	assert_eq!(transport.payloads().len(), 1);
}

#[tokio::test]
async fn report_message_drops_its_entry_frame_from_any_producer() {
	let transport = RecordingTransport::default();
	let client = SleurenClient::builder()
		.key("project-key")
		.transport(transport.clone())
		.stack_trace_producer(FixedFramesProducer(vec![
			("my_app::logging", "log_failure"),
			("my_app::server", "handle_request"),
		]))
		.build()
		.unwrap();

	client.report_message("m").await;
	client.report(error("e")).await;

	let payloads = transport.payloads();
	assert_eq!(methods(&payloads[0].report), vec!["handle_request"]);
	assert_eq!(methods(&payloads[1].report), vec!["log_failure", "handle_request"]);
}

#[tokio::test]
async fn report_message_skips_client_frames_above_the_caller() {
	let transport = RecordingTransport::default();
	let client = SleurenClient::builder()
		.key("project-key")
		.transport(transport.clone())
		.stack_trace_producer(FixedFramesProducer(vec![
			("sleuren::client::SleurenClient::report_message_with", "{{closure}}"),
			("sleuren::client::SleurenClient::report_message", "{{closure}}"),
			("my_app::server", "handle_request"),
		]))
		.build()
		.unwrap();

	client.report_message("m").await;

	assert_eq!(methods(&transport.payloads()[0].report), vec!["handle_request"]);
}

#[tokio::test]
async fn report_message_with_a_live_backtrace_starts_outside_the_client() {
	let transport = RecordingTransport::default();
	let client = SleurenClient::builder()
		.key("project-key")
		.transport(transport.clone())
		.build()
		.unwrap();

	client.report_message("from the test").await;

	let payloads = transport.payloads();
	assert_eq!(payloads.len(), 1);
	if let Some(first) = payloads[0].report.stacktrace.first() {
		assert!(!first.class.starts_with("sleuren::"), "leading frame {first:?}");
	}
}

#[tokio::test]
async fn glow_cap_can_change_after_build() {
	let (client, transport, _) = setup();
	for name in ["one", "two", "three"] {
		client.glow(name, MessageLevel::Info, Vec::new()).await;
	}

	client.set_max_glows_per_report(1).await;
	client.report(error("boom")).await;

	let payloads = transport.payloads();
	let names: Vec<&str> = payloads[0].report.glows.iter().map(|g| g.name.as_str()).collect();
	assert_eq!(names, vec!["three"]);
	assert_eq!(client.config().await.max_glows_per_report, 1);
}

#[tokio::test]
async fn rate_cap_can_change_after_build() {
	let transport = RecordingTransport::default();
	let producer = CountingProducer::default();
	let client = builder(&transport, &producer)
		.max_reports_per_minute(1)
		.build()
		.unwrap();

	client.report(error("first")).await;
	client.report(error("dropped")).await;
	client.set_max_reports_per_minute(2).await;
	client.report(error("admitted")).await;

	let messages: Vec<String> = transport
		.payloads()
		.into_iter()
		.map(|p| p.report.message)
		.collect();
	assert_eq!(messages, vec!["first", "admitted"]);
}
