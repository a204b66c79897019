// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User hooks that gate or transform reports in flight.
//!
//! Two hook slots exist:
//!
//! | Hook | Runs | Returning `None` |
//! |------|------|------------------|
//! | [`BeforeEvaluate`] | before any stack trace or solution work | suppresses the error |
//! | [`BeforeSubmit`] | after the report is assembled | skips submission |
//!
//! A hook that returns a value hands that value on; the returned report is
//! what gets dispatched. Plain closures implement both traits:
//!
//! ```ignore
//! client.set_before_submit(|mut report: ErrorReport| {
//!     report.message = redact(&report.message);
//!     Some(report)
//! }).await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use sleuren_core::ErrorReport;
use tokio::sync::RwLock;

use crate::captured::CapturedError;

/// Gate run on every error passed to `report`.
#[async_trait]
pub trait BeforeEvaluate: Send + Sync {
	async fn before_evaluate(&self, error: CapturedError) -> Option<CapturedError>;
}

/// Gate run on every assembled report before it is dispatched.
#[async_trait]
pub trait BeforeSubmit: Send + Sync {
	async fn before_submit(&self, report: ErrorReport) -> Option<ErrorReport>;
}

/// Identity hook, installed by default in both slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl BeforeEvaluate for PassThrough {
	async fn before_evaluate(&self, error: CapturedError) -> Option<CapturedError> {
		Some(error)
	}
}

#[async_trait]
impl BeforeSubmit for PassThrough {
	async fn before_submit(&self, report: ErrorReport) -> Option<ErrorReport> {
		Some(report)
	}
}

#[async_trait]
impl<F> BeforeEvaluate for F
where
	F: Fn(CapturedError) -> Option<CapturedError> + Send + Sync,
{
	async fn before_evaluate(&self, error: CapturedError) -> Option<CapturedError> {
		self(error)
	}
}

#[async_trait]
impl<F> BeforeSubmit for F
where
	F: Fn(ErrorReport) -> Option<ErrorReport> + Send + Sync,
{
	async fn before_submit(&self, report: ErrorReport) -> Option<ErrorReport> {
		self(report)
	}
}

/// The two hook slots of a client.
pub(crate) struct HookPipeline {
	before_evaluate: RwLock<Arc<dyn BeforeEvaluate>>,
	before_submit: RwLock<Arc<dyn BeforeSubmit>>,
}

impl Default for HookPipeline {
	fn default() -> Self {
		Self::new(Arc::new(PassThrough), Arc::new(PassThrough))
	}
}

impl HookPipeline {
	pub(crate) fn new(
		before_evaluate: Arc<dyn BeforeEvaluate>,
		before_submit: Arc<dyn BeforeSubmit>,
	) -> Self {
		Self {
			before_evaluate: RwLock::new(before_evaluate),
			before_submit: RwLock::new(before_submit),
		}
	}

	pub(crate) async fn set_before_evaluate(&self, hook: Arc<dyn BeforeEvaluate>) {
		*self.before_evaluate.write().await = hook;
	}

	pub(crate) async fn set_before_submit(&self, hook: Arc<dyn BeforeSubmit>) {
		*self.before_submit.write().await = hook;
	}

	/// Runs the evaluate hook. The slot lock is released before the hook runs.
	pub(crate) async fn evaluate(&self, error: CapturedError) -> Option<CapturedError> {
		let hook = self.before_evaluate.read().await.clone();
		hook.before_evaluate(error).await
	}

	/// Runs the submit hook. The slot lock is released before the hook runs.
	pub(crate) async fn submit(&self, report: ErrorReport) -> Option<ErrorReport> {
		let hook = self.before_submit.read().await.clone();
		hook.before_submit(report).await
	}
}
