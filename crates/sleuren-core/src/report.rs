// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The error report submitted to the collector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::Context;
use crate::glow::Glow;
use crate::solution::Solution;

/// Platform tag sent with every report from this client.
pub const LANGUAGE: &str = "rust";

/// A single frame of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
	pub line_number: u32,
	pub column_number: u32,
	/// Function name without its module path.
	pub method: String,
	pub file: String,
	/// Source lines around `line_number`, keyed by line number.
	#[serde(default)]
	pub code_snippet: BTreeMap<u32, String>,
	pub trimmed_column_number: Option<u32>,
	/// Module path (and type, for methods) that owns `method`.
	pub class: String,
}

/// The unit of submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
	pub notifier: String,
	pub exception_class: String,
	/// Milliseconds since the Unix epoch when the error was seen.
	pub seen_at: i64,
	pub message: String,
	pub language: String,
	pub glows: Vec<Glow>,
	pub context: Context,
	pub stacktrace: Vec<StackFrame>,
	pub sourcemap_version_id: String,
	pub solutions: Vec<Solution>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stage: Option<String>,
}
