// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration.

use std::fmt;
use std::time::Duration;

use tracing::warn;

/// Client version sent in the report notifier string.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collector endpoint used when none is configured.
pub const DEFAULT_REPORTING_URL: &str = "https://sleuren.com/api/log";

/// Maximum number of glows kept for the next report.
pub const DEFAULT_MAX_GLOWS_PER_REPORT: usize = 30;

/// Maximum number of reports dispatched in any trailing minute.
pub const DEFAULT_MAX_REPORTS_PER_MINUTE: usize = 500;

/// Timeout for report submission requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Project key baked in at compile time, if any.
const BUILD_KEY: Option<&str> = option_env!("SLEUREN_KEY");

/// Sourcemap version baked in at compile time, if any.
const BUILD_SOURCEMAP_VERSION: Option<&str> = option_env!("SLEUREN_SOURCEMAP_VERSION");

/// Configuration for the Sleuren client.
#[derive(Clone)]
pub struct ClientConfig {
	/// Project API key. Reports are not sent without one.
	pub key: Option<String>,
	/// Collector endpoint receiving report submissions.
	pub reporting_url: String,
	/// Maximum glows kept for the next report.
	pub max_glows_per_report: usize,
	/// Maximum reports dispatched in any trailing 60 second window.
	pub max_reports_per_minute: usize,
	/// Deployment stage label, e.g. `production`.
	pub stage: Option<String>,
	/// Timeout for submission requests.
	pub request_timeout: Duration,
	/// Identifies the source map (or debug symbol) upload matching this build.
	pub sourcemap_version: String,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			key: BUILD_KEY.filter(|key| !key.is_empty()).map(str::to_string),
			reporting_url: DEFAULT_REPORTING_URL.to_string(),
			max_glows_per_report: DEFAULT_MAX_GLOWS_PER_REPORT,
			max_reports_per_minute: DEFAULT_MAX_REPORTS_PER_MINUTE,
			stage: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			sourcemap_version: BUILD_SOURCEMAP_VERSION.unwrap_or_default().to_string(),
		}
	}
}

impl fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientConfig")
			.field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
			.field("reporting_url", &self.reporting_url)
			.field("max_glows_per_report", &self.max_glows_per_report)
			.field("max_reports_per_minute", &self.max_reports_per_minute)
			.field("stage", &self.stage)
			.field("request_timeout", &self.request_timeout)
			.field("sourcemap_version", &self.sourcemap_version)
			.finish()
	}
}

impl ClientConfig {
	/// Builds a configuration from the defaults overlaid with `SLEUREN_*`
	/// environment variables.
	///
	/// | Variable | Field |
	/// |----------|-------|
	/// | `SLEUREN_KEY` | `key` |
	/// | `SLEUREN_REPORTING_URL` | `reporting_url` |
	/// | `SLEUREN_STAGE` | `stage` |
	/// | `SLEUREN_MAX_GLOWS_PER_REPORT` | `max_glows_per_report` |
	/// | `SLEUREN_MAX_REPORTS_PER_MINUTE` | `max_reports_per_minute` |
	/// | `SLEUREN_SOURCEMAP_VERSION` | `sourcemap_version` |
	pub fn from_env() -> Self {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();

		if let Some(key) = lookup("SLEUREN_KEY").filter(|key| !key.is_empty()) {
			config.key = Some(key);
		}
		if let Some(url) = lookup("SLEUREN_REPORTING_URL").filter(|url| !url.is_empty()) {
			config.reporting_url = url;
		}
		if let Some(stage) = lookup("SLEUREN_STAGE").filter(|stage| !stage.is_empty()) {
			config.stage = Some(stage);
		}
		if let Some(version) = lookup("SLEUREN_SOURCEMAP_VERSION").filter(|v| !v.is_empty()) {
			config.sourcemap_version = version;
		}
		if let Some(max) = parse_count(&lookup, "SLEUREN_MAX_GLOWS_PER_REPORT") {
			config.max_glows_per_report = max;
		}
		if let Some(max) = parse_count(&lookup, "SLEUREN_MAX_REPORTS_PER_MINUTE") {
			config.max_reports_per_minute = max;
		}

		config
	}

	/// Returns the configured key unless it is empty or blank.
	pub fn api_key(&self) -> Option<&str> {
		self.key.as_deref().filter(|key| !key.trim().is_empty())
	}
}

fn parse_count(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<usize> {
	let raw = lookup(name)?;
	match raw.trim().parse() {
		Ok(value) => Some(value),
		Err(_) => {
			warn!(variable = name, value = %raw, "Ignoring non-numeric Sleuren setting");
			None
		}
	}
}
