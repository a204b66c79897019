// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the Sleuren client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, SleurenError>;

/// Errors that can occur in the Sleuren client.
///
/// None of these reach the host through `report`; the pipeline turns them
/// into a skipped report and a debug diagnostic.
#[derive(Debug, Error)]
pub enum SleurenError {
	/// The reporting URL could not be parsed.
	#[error("invalid reporting URL: {0}")]
	InvalidReportingUrl(String),

	/// A URL handed to a context collector could not be parsed.
	#[error("invalid URL: {0}")]
	InvalidUrl(String),

	/// The HTTP client could not be built or a request failed.
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// A solution provider failed to answer.
	#[error("solution provider {provider} failed: {message}")]
	SolutionProvider {
		/// Name of the failing provider.
		provider: String,
		/// What went wrong.
		message: String,
	},

	/// A payload could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl SleurenError {
	/// Builds a [`SleurenError::SolutionProvider`] error.
	pub fn solution_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
		Self::SolutionProvider {
			provider: provider.into(),
			message: message.into(),
		}
	}
}
