// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Solution providers and the two-phase resolution protocol.
//!
//! Resolving solutions for an error runs in two phases:
//!
//! 1. Every registered provider is asked [`SolutionProvider::can_solve`]
//!    concurrently, and the resolver waits for all of them.
//! 2. Providers that answered `true` are asked
//!    [`SolutionProvider::get_solutions`] concurrently, and the resolver
//!    waits again.
//!
//! The solutions are flattened in registration order, whatever order the
//! providers finish in.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use sleuren::{CapturedError, ExtraParameters, Result, Solution, SolutionProvider};
//!
//! struct MissingConfigProvider;
//!
//! #[async_trait]
//! impl SolutionProvider for MissingConfigProvider {
//!     async fn can_solve(&self, error: &CapturedError, _: &ExtraParameters) -> Result<bool> {
//!         Ok(error.message().contains("config.toml"))
//!     }
//!
//!     async fn get_solutions(&self, _: &CapturedError, _: &ExtraParameters) -> Result<Vec<Solution>> {
//!         Ok(vec![Solution::new("MissingConfig", "Create config.toml", "Copy config.example.toml")])
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use sleuren_core::Solution;
use tracing::debug;

use crate::captured::CapturedError;
use crate::error::Result;

/// Free-form parameters passed through to solution providers.
pub type ExtraParameters = serde_json::Map<String, serde_json::Value>;

/// Suggests fixes for captured errors.
#[async_trait]
pub trait SolutionProvider: Send + Sync {
	/// Name used in diagnostics.
	fn name(&self) -> &str {
		std::any::type_name::<Self>()
	}

	/// Returns whether this provider has anything to say about `error`.
	async fn can_solve(&self, error: &CapturedError, extra: &ExtraParameters) -> Result<bool>;

	/// Produces solutions for `error`. Only called after `can_solve`
	/// returned `true` for the same report.
	async fn get_solutions(
		&self,
		error: &CapturedError,
		extra: &ExtraParameters,
	) -> Result<Vec<Solution>>;
}

/// A solution provider shared between the client and its reports.
pub type SharedSolutionProvider = Arc<dyn SolutionProvider>;

/// Runs both resolution phases over `providers` and flattens the result.
///
/// Any provider failure fails the whole resolution, after every call of the
/// current phase has settled.
pub async fn resolve_solutions(
	providers: &[SharedSolutionProvider],
	error: &CapturedError,
	extra: &ExtraParameters,
) -> Result<Vec<Solution>> {
	if providers.is_empty() {
		return Ok(Vec::new());
	}

	let answers = join_all(providers.iter().map(|p| p.can_solve(error, extra))).await;

	let mut eligible = Vec::with_capacity(providers.len());
	for (provider, answer) in providers.iter().zip(answers) {
		if answer? {
			eligible.push(provider);
		}
	}

	debug!(
		providers = providers.len(),
		eligible = eligible.len(),
		"Resolved solution provider eligibility"
	);

	let batches = join_all(eligible.iter().map(|p| p.get_solutions(error, extra))).await;

	let mut solutions = Vec::new();
	for batch in batches {
		solutions.extend(batch?);
	}

	Ok(solutions)
}
