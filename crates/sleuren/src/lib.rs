// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error capture and reporting client for Sleuren.
//!
//! The client captures errors from the host application, enriches them with
//! a stack trace, glows (breadcrumbs), context and suggested solutions, and
//! submits the resulting report to the Sleuren collector.
//!
//! # Quick Start
//!
//! ```ignore
//! use sleuren::{CapturedError, MessageLevel, SleurenClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SleurenClient::builder()
//!         .key("your_project_key")
//!         .stage("production")
//!         .build()?;
//!
//!     // Report panics automatically
//!     client.install_panic_hook();
//!
//!     client.glow("startup complete", MessageLevel::Info, Vec::new()).await;
//!     client.add_context("region", serde_json::json!("eu-west-1")).await;
//!
//!     if let Err(e) = std::fs::read_to_string("config.toml") {
//!         client.report(CapturedError::from_error(&e)).await;
//!     }
//!
//!     client.report_message("cache rebuilt").await;
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! `report` runs the before-evaluate hook, then builds the stack trace and
//! resolves solutions concurrently, merges context, and hands the report to
//! submission. Submission checks the project key and the per-minute rate
//! limit, runs the before-submit hook, and dispatches without waiting for
//! the collector's response.
//!
//! Reporting never fails and never panics. Faults inside the client drop
//! the report; with debug mode on, the reason is logged at `warn` level.
//!
//! # Configuration
//!
//! [`ClientConfig::from_env`] reads `SLEUREN_KEY`, `SLEUREN_REPORTING_URL`,
//! `SLEUREN_MAX_GLOWS_PER_REPORT`, `SLEUREN_MAX_REPORTS_PER_MINUTE`,
//! `SLEUREN_STAGE` and `SLEUREN_SOURCEMAP_VERSION`. A key and sourcemap
//! version can also be baked in at build time through the same variables.

mod backtrace;
mod breadcrumbs;
mod captured;
mod client;
mod config;
mod context;
mod diagnostics;
mod error;
mod hooks;
mod panic_hook;
mod rate_limit;
mod solutions;
mod transport;

pub use backtrace::{read_lines_from_file, BacktraceProducer, StackTraceProducer};
pub use breadcrumbs::BreadcrumbLog;
pub use captured::{CapturedError, PANIC_CLASS};
pub use client::{SleurenClient, SleurenClientBuilder, DEFAULT_MESSAGE_CLASS};
pub use config::{
	ClientConfig, CLIENT_VERSION, DEFAULT_MAX_GLOWS_PER_REPORT, DEFAULT_MAX_REPORTS_PER_MINUTE,
	DEFAULT_REPORTING_URL, DEFAULT_REQUEST_TIMEOUT,
};
pub use context::{
	ContextCollector, ContextStore, CookieCollector, QueryStringCollector, RequestCollector,
};
pub use error::{Result, SleurenError};
pub use hooks::{BeforeEvaluate, BeforeSubmit, PassThrough};
pub use panic_hook::install_panic_hook;
pub use rate_limit::{RateLimiter, WINDOW_MILLIS};
pub use solutions::{resolve_solutions, ExtraParameters, SharedSolutionProvider, SolutionProvider};
pub use transport::{HttpTransport, ReportPayload, Transport, USER_AGENT};

// Re-export core types for convenience
pub use sleuren_core::{
	Context, ErrorReport, Glow, MessageLevel, Solution, StackFrame, COOKIES_GROUP, CUSTOM_GROUP,
	LANGUAGE, REQUEST_DATA_GROUP, REQUEST_GROUP,
};
