// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Report delivery to the collector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sleuren_core::ErrorReport;
use tracing::debug;

use crate::diagnostics::check;
use crate::error::{Result, SleurenError};

/// User agent sent with every submission.
pub const USER_AGENT: &str = "Sleuren-Package";

/// Marks submissions as programmatic requests.
const REQUESTED_WITH: &str = "XMLHttpRequest";

/// Body of a submission: the report plus the project key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
	#[serde(flatten)]
	pub report: ErrorReport,
	pub project: String,
}

/// Delivers report payloads.
///
/// Submission is fire-and-forget: implementations must not block, and the
/// caller never learns whether delivery succeeded.
pub trait Transport: Send + Sync {
	fn submit(&self, payload: ReportPayload);
}

/// Posts payloads as JSON to the collector's reporting URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: Client,
	reporting_url: String,
	debug: Arc<AtomicBool>,
}

impl HttpTransport {
	pub fn new(reporting_url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert("X-Requested-With", HeaderValue::from_static(REQUESTED_WITH));

		let client = Client::builder()
			.user_agent(USER_AGENT)
			.default_headers(headers)
			.timeout(timeout)
			.build()
			.map_err(SleurenError::Http)?;

		Ok(Self {
			client,
			reporting_url: reporting_url.into(),
			debug: Arc::new(AtomicBool::new(false)),
		})
	}

	/// Shares the owning client's debug flag, which decides whether delivery
	/// faults are logged at `warn`.
	pub fn with_debug_flag(mut self, debug: Arc<AtomicBool>) -> Self {
		self.debug = debug;
		self
	}

	pub fn reporting_url(&self) -> &str {
		&self.reporting_url
	}

	/// Posts one payload and waits for the response status.
	pub async fn send(&self, payload: &ReportPayload) -> Result<StatusCode> {
		debug!(url = %self.reporting_url, exception_class = %payload.report.exception_class, "Sending error report");

		let body = serde_json::to_vec(payload)?;
		let response = self
			.client
			.post(&self.reporting_url)
			.body(body)
			.send()
			.await?;

		Ok(response.status())
	}
}

impl Transport for HttpTransport {
	fn submit(&self, payload: ReportPayload) {
		let debug = self.debug.load(Ordering::SeqCst);
		let handle = match tokio::runtime::Handle::try_current() {
			Ok(handle) => handle,
			Err(_) => {
				check(false, "No tokio runtime available; error report dropped", debug);
				return;
			}
		};

		let transport = self.clone();
		handle.spawn(async move {
			match transport.send(&payload).await {
				Ok(status) if status.is_success() => debug!(status = status.as_u16(), "Error report delivered"),
				Ok(status) => {
					check(false, &format!("Collector rejected error report with status {status}"), debug);
				}
				Err(e) => {
					check(false, &format!("Failed to deliver error report: {e}"), debug);
				}
			}
		});
	}
}
