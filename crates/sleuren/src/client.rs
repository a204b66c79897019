// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The Sleuren client: session state, report assembly and submission.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use sleuren_core::{Context, ErrorReport, Glow, MessageLevel, Solution, StackFrame, LANGUAGE};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::backtrace::{is_client_frame, BacktraceProducer, StackTraceProducer};
use crate::breadcrumbs::BreadcrumbLog;
use crate::captured::CapturedError;
use crate::config::{ClientConfig, CLIENT_VERSION};
use crate::context::{ContextCollector, ContextStore};
use crate::diagnostics::check;
use crate::error::{Result, SleurenError};
use crate::hooks::{BeforeEvaluate, BeforeSubmit, HookPipeline, PassThrough};
use crate::panic_hook::install_panic_hook;
use crate::rate_limit::RateLimiter;
use crate::solutions::{resolve_solutions, ExtraParameters, SharedSolutionProvider, SolutionProvider};
use crate::transport::{HttpTransport, ReportPayload, Transport};

/// Exception class used by [`SleurenClient::report_message`].
pub const DEFAULT_MESSAGE_CLASS: &str = "Log";

const MISSING_KEY_MESSAGE: &str = "The client was not yet initialised with an API key. \
	Call client.light(\"<project-key>\") when you initialise your app. \
	If you are running in dev mode and left the key out on purpose, you can ignore this message.";

const EMPTY_KEY_MESSAGE: &str =
	"An empty or incorrect Sleuren key was passed, errors will not be reported.";

tokio::task_local! {
	/// Set while a report pipeline is being polled.
	static IN_PIPELINE: ();
}

/// Returns true when called from inside a report pipeline.
pub(crate) fn in_pipeline() -> bool {
	IN_PIPELINE.try_with(|_| ()).is_ok()
}

/// Builder for constructing a [`SleurenClient`].
pub struct SleurenClientBuilder {
	config: ClientConfig,
	debug: bool,
	transport: Option<Arc<dyn Transport>>,
	stack_traces: Option<Arc<dyn StackTraceProducer>>,
	before_evaluate: Arc<dyn BeforeEvaluate>,
	before_submit: Arc<dyn BeforeSubmit>,
	solution_providers: Vec<SharedSolutionProvider>,
	collectors: Vec<Arc<dyn ContextCollector>>,
}

impl SleurenClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			config: ClientConfig::default(),
			debug: false,
			transport: None,
			stack_traces: None,
			before_evaluate: Arc::new(PassThrough),
			before_submit: Arc::new(PassThrough),
			solution_providers: Vec::new(),
			collectors: Vec::new(),
		}
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the project API key.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.config.key = Some(key.into());
		self
	}

	/// Sets the collector endpoint.
	///
	/// Example: `https://sleuren.com/api/log`
	pub fn reporting_url(mut self, url: impl Into<String>) -> Self {
		self.config.reporting_url = url.into();
		self
	}

	/// Sets the maximum number of glows kept for the next report.
	pub fn max_glows_per_report(mut self, max: usize) -> Self {
		self.config.max_glows_per_report = max;
		self
	}

	/// Sets the maximum number of reports dispatched per minute.
	pub fn max_reports_per_minute(mut self, max: usize) -> Self {
		self.config.max_reports_per_minute = max;
		self
	}

	/// Sets the stage label, e.g. `production`.
	pub fn stage(mut self, stage: impl Into<String>) -> Self {
		self.config.stage = Some(stage.into());
		self
	}

	/// Sets the timeout for submission requests.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	/// Sets the sourcemap (debug symbol) version id sent with reports.
	pub fn sourcemap_version(mut self, version: impl Into<String>) -> Self {
		self.config.sourcemap_version = version.into();
		self
	}

	/// Enables diagnostics for faults inside the client.
	pub fn debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Replaces the HTTP transport.
	pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
		self.transport = Some(Arc::new(transport));
		self
	}

	/// Replaces the backtrace-based stack trace producer.
	pub fn stack_trace_producer(mut self, producer: impl StackTraceProducer + 'static) -> Self {
		self.stack_traces = Some(Arc::new(producer));
		self
	}

	pub fn before_evaluate(mut self, hook: impl BeforeEvaluate + 'static) -> Self {
		self.before_evaluate = Arc::new(hook);
		self
	}

	pub fn before_submit(mut self, hook: impl BeforeSubmit + 'static) -> Self {
		self.before_submit = Arc::new(hook);
		self
	}

	pub fn solution_provider(mut self, provider: impl SolutionProvider + 'static) -> Self {
		self.solution_providers.push(Arc::new(provider));
		self
	}

	pub fn context_collector(mut self, collector: impl ContextCollector + 'static) -> Self {
		self.collectors.push(Arc::new(collector));
		self
	}

	/// Builds the client.
	pub fn build(self) -> Result<SleurenClient> {
		Url::parse(&self.config.reporting_url)
			.map_err(|e| SleurenError::InvalidReportingUrl(format!("{}: {e}", self.config.reporting_url)))?;

		let mut config = self.config;
		if config.api_key().is_none() {
			config.key = None;
		}

		let debug = Arc::new(AtomicBool::new(self.debug));
		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(
				HttpTransport::new(config.reporting_url.clone(), config.request_timeout)?
					.with_debug_flag(debug.clone()),
			),
		};
		let stack_traces = self
			.stack_traces
			.unwrap_or_else(|| Arc::new(BacktraceProducer::default()));

		info!(
			reporting_url = %config.reporting_url,
			has_key = config.key.is_some(),
			debug = self.debug,
			"Sleuren client initialized"
		);

		let inner = Arc::new(ClientInner {
			debug,
			hooks: HookPipeline::new(self.before_evaluate, self.before_submit),
			solution_providers: RwLock::new(self.solution_providers),
			collectors: RwLock::new(self.collectors),
			breadcrumbs: Mutex::new(BreadcrumbLog::new(config.max_glows_per_report)),
			context: RwLock::new(ContextStore::new()),
			rate_limiter: Mutex::new(RateLimiter::new(config.max_reports_per_minute)),
			stack_traces,
			transport,
			config: RwLock::new(config),
		});

		Ok(SleurenClient { inner })
	}
}

impl Default for SleurenClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Session state shared by every handle to a client.
struct ClientInner {
	config: RwLock<ClientConfig>,
	debug: Arc<AtomicBool>,
	hooks: HookPipeline,
	solution_providers: RwLock<Vec<SharedSolutionProvider>>,
	collectors: RwLock<Vec<Arc<dyn ContextCollector>>>,
	breadcrumbs: Mutex<BreadcrumbLog>,
	context: RwLock<ContextStore>,
	rate_limiter: Mutex<RateLimiter>,
	stack_traces: Arc<dyn StackTraceProducer>,
	transport: Arc<dyn Transport>,
}

/// Client for capturing errors and reporting them to Sleuren.
///
/// Create one at startup and keep it for the life of the process. Handles
/// are cheap to clone and share the same session.
///
/// # Example
///
/// ```ignore
/// use sleuren::{CapturedError, MessageLevel, SleurenClient};
///
/// let client = SleurenClient::builder()
///     .key("project-key")
///     .stage("production")
///     .build()?;
///
/// client.install_panic_hook();
///
/// client.glow("user logged in", MessageLevel::Info, Vec::new()).await;
/// client.add_context("tenant", serde_json::json!("acme")).await;
///
/// if let Err(e) = load_config() {
///     client.report(CapturedError::from_error(&e)).await;
/// }
/// ```
#[derive(Clone)]
pub struct SleurenClient {
	inner: Arc<ClientInner>,
}

impl SleurenClient {
	/// Creates a new builder for constructing a client.
	pub fn builder() -> SleurenClientBuilder {
		SleurenClientBuilder::new()
	}

	/// Sets the project key and debug mode after construction.
	///
	/// An empty key is rejected with a diagnostic and the previous key kept.
	pub async fn light(&self, key: impl Into<String>, debug: bool) {
		self.set_debug(debug);

		let key = key.into();
		if !check(!key.trim().is_empty(), EMPTY_KEY_MESSAGE, debug) {
			return;
		}

		self.inner.config.write().await.key = Some(key);
	}

	pub fn is_debug(&self) -> bool {
		self.inner.debug.load(Ordering::SeqCst)
	}

	pub fn set_debug(&self, debug: bool) {
		self.inner.debug.store(debug, Ordering::SeqCst);
	}

	/// Sets or clears the stage label sent with reports.
	pub async fn set_stage(&self, stage: Option<String>) {
		self.inner.config.write().await.stage = stage;
	}

	/// Changes how many glows are kept for the next report. Glows over the new
	/// cap are evicted immediately, oldest first.
	pub async fn set_max_glows_per_report(&self, max: usize) {
		self.inner.config.write().await.max_glows_per_report = max;
		self.inner.breadcrumbs.lock().await.set_capacity(max);
	}

	/// Changes how many reports may be dispatched in any trailing minute.
	pub async fn set_max_reports_per_minute(&self, max: usize) {
		self.inner.config.write().await.max_reports_per_minute = max;
		self.inner.rate_limiter.lock().await.set_max_per_window(max);
	}

	/// Returns a copy of the current configuration.
	pub async fn config(&self) -> ClientConfig {
		self.inner.config.read().await.clone()
	}

	/// Records a glow for the next report.
	pub async fn glow(
		&self,
		name: impl Into<String>,
		level: MessageLevel,
		meta_data: Vec<serde_json::Value>,
	) {
		self.inner
			.breadcrumbs
			.lock()
			.await
			.record(name, level, meta_data);
	}

	/// Returns the glows that would be attached to a report now.
	pub async fn glows(&self) -> Vec<Glow> {
		self.inner.breadcrumbs.lock().await.snapshot()
	}

	pub async fn clear_glows(&self) {
		self.inner.breadcrumbs.lock().await.clear();
	}

	/// Sets a custom context field attached to every report.
	pub async fn add_context(&self, name: impl Into<String>, value: serde_json::Value) {
		self.inner.context.write().await.set_field(name, value);
	}

	/// Replaces a named context group attached to every report.
	pub async fn add_context_group(&self, group: impl Into<String>, value: serde_json::Value) {
		self.inner.context.write().await.set_group(group, value);
	}

	/// Returns the persistent context.
	pub async fn context(&self) -> Context {
		self.inner.context.read().await.snapshot()
	}

	/// Registers a solution provider. Providers are consulted in
	/// registration order and never removed.
	pub async fn register_solution_provider(&self, provider: impl SolutionProvider + 'static) {
		let provider: SharedSolutionProvider = Arc::new(provider);
		debug!(provider = provider.name(), "Registered solution provider");
		self.inner.solution_providers.write().await.push(provider);
	}

	/// Registers an environment context collector.
	pub async fn register_context_collector(&self, collector: impl ContextCollector + 'static) {
		self.inner.collectors.write().await.push(Arc::new(collector));
	}

	pub async fn set_before_evaluate(&self, hook: impl BeforeEvaluate + 'static) {
		self.inner.hooks.set_before_evaluate(Arc::new(hook)).await;
	}

	pub async fn set_before_submit(&self, hook: impl BeforeSubmit + 'static) {
		self.inner.hooks.set_before_submit(Arc::new(hook)).await;
	}

	/// Installs a panic hook that reports panics through this client.
	///
	/// The previously installed hook still runs afterwards.
	pub fn install_panic_hook(&self) {
		install_panic_hook(self.clone());
		info!("Panic hook installed");
	}

	/// Reports an error.
	///
	/// Never fails and never panics: every fault inside the pipeline drops
	/// the report and, in debug mode, logs why.
	pub async fn report(&self, error: CapturedError) {
		self.report_with(error, Context::new(), ExtraParameters::new())
			.await;
	}

	/// Reports an error with ad hoc context and solution provider parameters.
	pub async fn report_with(&self, error: CapturedError, context: Context, extra: ExtraParameters) {
		guarded(self.run_report(error, context, extra), self.is_debug()).await;
	}

	/// Reports an error on a background task.
	pub fn spawn_report(&self, error: CapturedError) -> JoinHandle<()> {
		let client = self.clone();
		tokio::spawn(async move { client.report(error).await })
	}

	/// Reports a plain message with the `Log` exception class.
	pub async fn report_message(&self, message: impl Into<String>) {
		self.report_message_with(message, Context::new(), DEFAULT_MESSAGE_CLASS)
			.await;
	}

	/// Reports a plain message.
	///
	/// Skips solution resolution and the evaluate hook. The stack trace is
	/// taken at the call site.
	pub async fn report_message_with(
		&self,
		message: impl Into<String>,
		context: Context,
		exception_class: &str,
	) {
		let error = CapturedError::new(exception_class, message);
		guarded(self.run_report_message(error, context), self.is_debug()).await;
	}

	/// Reports a fixed error to check that reports reach the collector.
	pub async fn test(&self) {
		self.report(CapturedError::new(
			"Error",
			"The Sleuren client is set up correctly!",
		))
		.await;
	}

	/// Assembles a report for `error` without submitting it.
	///
	/// Returns `None` when a solution provider or the stack trace producer
	/// fails.
	pub async fn create_report(
		&self,
		error: &CapturedError,
		context: &Context,
		extra: &ExtraParameters,
	) -> Option<ErrorReport> {
		let seen_at = Utc::now().timestamp_millis();
		let debug = self.is_debug();
		let providers = self.inner.solution_providers.read().await.clone();

		let (solutions, stacktrace) = futures::join!(
			resolve_solutions(&providers, error, extra),
			self.inner.stack_traces.produce(error),
		);

		let solutions = match solutions {
			Ok(solutions) => solutions,
			Err(e) => {
				check(false, &format!("Could not resolve solutions for {error}: {e}"), debug);
				return None;
			}
		};
		let stacktrace = match stacktrace {
			Ok(stacktrace) => stacktrace,
			Err(e) => {
				check(false, &format!("Couldn't generate stacktrace of {error}: {e}"), debug);
				return None;
			}
		};

		check(
			!stacktrace.is_empty(),
			&format!("Couldn't generate stacktrace of this error: {error}"),
			debug,
		);

		Some(
			self.build_report(error, seen_at, context, stacktrace, solutions)
				.await,
		)
	}

	/// Applies the key check, rate limit and submit hook, then dispatches.
	pub async fn send_report(&self, report: ErrorReport) {
		let debug = self.is_debug();

		let key = self.inner.config.read().await.key.clone();
		let Some(key) = key else {
			check(false, MISSING_KEY_MESSAGE, debug);
			return;
		};

		if self
			.inner
			.rate_limiter
			.lock()
			.await
			.is_limited(Utc::now().timestamp_millis())
		{
			debug!(exception_class = %report.exception_class, "Report dropped by rate limit");
			return;
		}

		let Some(report) = self.inner.hooks.submit(report).await else {
			debug!("Report dropped by before_submit hook");
			return;
		};

		// Checked again under the guard that records the dispatch.
		let mut limiter = self.inner.rate_limiter.lock().await;
		let now = Utc::now().timestamp_millis();
		if limiter.is_limited(now) {
			debug!(exception_class = %report.exception_class, "Report dropped by rate limit");
			return;
		}

		self.inner.transport.submit(ReportPayload {
			report,
			project: key,
		});
		limiter.record(now);
	}

	async fn run_report(&self, error: CapturedError, context: Context, extra: ExtraParameters) {
		let Some(error) = self.inner.hooks.evaluate(error).await else {
			debug!("Error suppressed by before_evaluate hook");
			return;
		};

		if let Some(report) = self.create_report(&error, &context, &extra).await {
			self.send_report(report).await;
		}
	}

	async fn run_report_message(&self, error: CapturedError, context: Context) {
		let seen_at = Utc::now().timestamp_millis();

		let stacktrace = match self.inner.stack_traces.produce(&error).await {
			Ok(stacktrace) => trim_message_frames(stacktrace),
			Err(e) => {
				check(false, &format!("Couldn't generate stacktrace of {error}: {e}"), self.is_debug());
				return;
			}
		};

		let report = self
			.build_report(&error, seen_at, &context, stacktrace, Vec::new())
			.await;
		self.send_report(report).await;
	}

	async fn build_report(
		&self,
		error: &CapturedError,
		seen_at: i64,
		context: &Context,
		stacktrace: Vec<StackFrame>,
		solutions: Vec<Solution>,
	) -> ErrorReport {
		let collected: Vec<Context> = self
			.inner
			.collectors
			.read()
			.await
			.iter()
			.map(|collector| collector.collect())
			.collect();
		let persistent = self.inner.context.read().await.snapshot();
		let glows = self.inner.breadcrumbs.lock().await.snapshot();
		let (stage, sourcemap_version_id) = {
			let config = self.inner.config.read().await;
			(config.stage.clone(), config.sourcemap_version.clone())
		};

		ErrorReport {
			notifier: format!("Sleuren Rust client v{CLIENT_VERSION}"),
			exception_class: error.class().to_string(),
			seen_at,
			message: error.message().to_string(),
			language: LANGUAGE.to_string(),
			glows,
			context: ContextStore::merge(&collected, context, &persistent),
			stacktrace,
			sourcemap_version_id,
			solutions,
			stage,
		}
	}
}

/// Drops the message entry point, which is always the first frame, and any
/// further frames of this crate above the caller.
fn trim_message_frames(frames: Vec<StackFrame>) -> Vec<StackFrame> {
	frames
		.into_iter()
		.skip(1)
		.skip_while(is_client_frame)
		.collect()
}

/// Runs a pipeline, containing any panic raised inside it.
async fn guarded(pipeline: impl Future<Output = ()>, debug: bool) {
	let pipeline = IN_PIPELINE.scope((), pipeline);
	if AssertUnwindSafe(pipeline).catch_unwind().await.is_err() {
		check(false, "Sleuren report pipeline panicked; report dropped", debug);
	}
}
