// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the report model.

use thiserror::Error;

/// Errors raised while parsing report types.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid message level: {0}")]
	InvalidMessageLevel(String),
}
