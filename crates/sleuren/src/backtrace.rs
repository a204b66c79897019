// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace construction from captured backtraces.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use rustc_demangle::demangle;
use sleuren_core::StackFrame;
use tracing::trace;

use crate::captured::CapturedError;
use crate::error::Result;

/// Module path prefix of this crate's own frames.
const CLIENT_MODULE_PREFIX: &str = "sleuren::";

/// Module path of the [`CapturedError`] constructors.
const CAPTURE_MODULE_PREFIX: &str = "sleuren::captured::";

/// Lines of source read on each side of a frame's line.
const DEFAULT_SNIPPET_RADIUS: u32 = 10;

/// Produces the ordered stack frames for a captured error.
///
/// Frames are returned innermost first. The client drops frames of its own
/// where it knows they lead the trace (see `report_message`), so producers
/// return everything from the capture site outwards.
#[async_trait]
pub trait StackTraceProducer: Send + Sync {
	async fn produce(&self, error: &CapturedError) -> Result<Vec<StackFrame>>;
}

/// Builds stack frames from the backtrace stored in a [`CapturedError`].
///
/// Frames from the backtrace machinery and the [`CapturedError`]
/// constructors are dropped. For panics, the panic hook and the runtime's
/// panic handling frames above the panicking code are dropped as well. For application frames whose source file is readable, the
/// lines around the frame are attached as a code snippet.
#[derive(Debug, Clone)]
pub struct BacktraceProducer {
	snippet_radius: u32,
}

impl Default for BacktraceProducer {
	fn default() -> Self {
		Self {
			snippet_radius: DEFAULT_SNIPPET_RADIUS,
		}
	}
}

impl BacktraceProducer {
	/// Sets how many lines around each frame are read. Zero disables snippets.
	pub fn with_snippet_radius(mut self, radius: u32) -> Self {
		self.snippet_radius = radius;
		self
	}
}

#[async_trait]
impl StackTraceProducer for BacktraceProducer {
	async fn produce(&self, error: &CapturedError) -> Result<Vec<StackFrame>> {
		let parsed = parse_backtrace_string(&error.backtrace().to_string());
		let parsed = trim_capture_frames(parsed, error.is_panic());

		let mut sources: HashMap<String, Option<Vec<String>>> = HashMap::new();
		let mut frames = Vec::with_capacity(parsed.len());

		for frame in parsed {
			let mut code_snippet = BTreeMap::new();

			if self.snippet_radius > 0 && frame.in_app && frame.line > 0 && !frame.file.is_empty() {
				if !sources.contains_key(&frame.file) {
					let lines = read_lines_from_file(&frame.file).await;
					sources.insert(frame.file.clone(), lines);
				}
				if let Some(Some(lines)) = sources.get(&frame.file) {
					code_snippet = snippet(lines, frame.line, self.snippet_radius);
				}
			}

			frames.push(frame.into_stack_frame(code_snippet));
		}

		Ok(frames)
	}
}

/// A frame parsed from backtrace text, before source snippets are attached.
#[derive(Debug, Clone, PartialEq)]
struct ParsedFrame {
	function: String,
	file: String,
	line: u32,
	column: u32,
	in_app: bool,
}

impl ParsedFrame {
	fn into_stack_frame(self, code_snippet: BTreeMap<u32, String>) -> StackFrame {
		let (class, method) = match self.function.rfind("::") {
			Some(idx) => (
				self.function[..idx].to_string(),
				self.function[idx + 2..].to_string(),
			),
			None => (String::new(), self.function.clone()),
		};

		StackFrame {
			line_number: self.line,
			column_number: self.column,
			method,
			file: self.file,
			code_snippet,
			trimmed_column_number: None,
			class,
		}
	}
}

/// Parses `std::backtrace::Backtrace` display output into frames.
///
/// The format is a numbered symbol line optionally followed by an
/// `at file:line:column` line:
///
/// ```text
///    3: my_app::handlers::process
///              at ./src/handlers.rs:42:9
/// ```
fn parse_backtrace_string(bt_string: &str) -> Vec<ParsedFrame> {
	let mut frames: Vec<ParsedFrame> = Vec::new();

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(frame) = frames.last_mut() {
				if frame.file.is_empty() {
					apply_location(frame, location);
				}
			}
			continue;
		}

		if let Some(frame) = parse_frame_line(line) {
			frames.push(frame);
		}
	}

	frames.retain(|frame| !is_capture_frame(&frame.function));
	frames
}

/// Parses a numbered symbol line such as `5: my_app::main`.
fn parse_frame_line(line: &str) -> Option<ParsedFrame> {
	let (index, symbol) = line.split_once(':')?;
	index.trim().parse::<u32>().ok()?;

	let symbol = symbol.trim();
	if symbol.is_empty() {
		return None;
	}

	let function = demangle(symbol).to_string();
	let in_app = is_in_app_frame(&function);

	Some(ParsedFrame {
		function,
		file: String::new(),
		line: 0,
		column: 0,
		in_app,
	})
}

/// Applies an `file:line:column` location. Paths may themselves contain `:`.
fn apply_location(frame: &mut ParsedFrame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let column = parts.next();
	let line = parts.next();
	let file = parts.next();

	match (file, line, column) {
		(Some(file), Some(line), Some(column)) => match (line.parse(), column.parse()) {
			(Ok(line), Ok(column)) => {
				frame.file = file.to_string();
				frame.line = line;
				frame.column = column;
			}
			_ => frame.file = location.to_string(),
		},
		_ => frame.file = location.to_string(),
	}
}

/// Drops the frames above the code that raised the error.
///
/// A captured backtrace starts inside the [`CapturedError`] constructor. A
/// panic backtrace additionally runs through this crate's panic hook and
/// the standard library's panic handling before reaching the panicking
/// function.
fn trim_capture_frames(frames: Vec<ParsedFrame>, panicked: bool) -> Vec<ParsedFrame> {
	frames
		.into_iter()
		.skip_while(|frame| is_constructor_frame(&frame.function))
		.skip_while(|frame| panicked && (is_client_function(&frame.function) || !frame.in_app))
		.collect()
}

fn is_constructor_frame(function: &str) -> bool {
	function
		.trim_start_matches('<')
		.starts_with(CAPTURE_MODULE_PREFIX)
}

fn is_client_function(function: &str) -> bool {
	function
		.trim_start_matches('<')
		.starts_with(CLIENT_MODULE_PREFIX)
}

/// Returns true for frames inside this crate.
pub(crate) fn is_client_frame(frame: &StackFrame) -> bool {
	is_client_function(&frame.class)
}

fn is_capture_frame(function: &str) -> bool {
	function.starts_with("std::backtrace")
		|| function.starts_with("<std::backtrace")
		|| function.starts_with("std::backtrace_rs")
}

/// Returns false for runtime, async plumbing and panic machinery frames.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"futures_util::",
		"<futures_util::",
		"async_trait::",
		"tracing::",
		"<tracing::",
		"panic_unwind::",
		"<panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
		"__libc_start",
		"_start",
	];

	const SYSTEM_CONTAINS: &[&str] = &[
		"::panic::",
		"::panicking::",
		"::thread::",
		"::rt::",
		"::runtime::",
		"::sys_common::",
	];

	if SYSTEM_PREFIXES.iter().any(|prefix| function.starts_with(prefix)) {
		return false;
	}

	!SYSTEM_CONTAINS.iter().any(|needle| function.contains(needle))
}

/// Reads a source file into lines, or `None` if it cannot be read.
pub async fn read_lines_from_file(path: &str) -> Option<Vec<String>> {
	match tokio::fs::read_to_string(path).await {
		Ok(contents) => Some(contents.lines().map(str::to_string).collect()),
		Err(e) => {
			trace!(path, error = %e, "Source file unavailable for snippet");
			None
		}
	}
}

/// Returns the 1-based lines within `radius` of `line`.
fn snippet(lines: &[String], line: u32, radius: u32) -> BTreeMap<u32, String> {
	let first = line.saturating_sub(radius).max(1);
	let last = line.saturating_add(radius).min(lines.len() as u32);

	(first..=last)
		.filter_map(|number| {
			lines
				.get(number as usize - 1)
				.map(|text| (number, text.clone()))
		})
		.collect()
}
