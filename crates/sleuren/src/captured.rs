// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The error value flowing through the report pipeline.

use std::backtrace::Backtrace;
use std::fmt;
use std::panic::PanicHookInfo;
use std::sync::Arc;

/// Exception class used for panics.
pub const PANIC_CLASS: &str = "panic";

/// An error captured for reporting.
///
/// Holds the exception class, the message, and a backtrace taken when the
/// value was created. Cloning is cheap; the backtrace is shared.
#[derive(Debug, Clone)]
pub struct CapturedError {
	class: String,
	message: String,
	backtrace: Arc<Backtrace>,
	panicked: bool,
}

impl CapturedError {
	/// Captures an error with an explicit class and message.
	pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			class: class.into(),
			message: message.into(),
			backtrace: Arc::new(Backtrace::force_capture()),
			panicked: false,
		}
	}

	/// Captures a typed error, using its type name as the class.
	pub fn from_error<E: std::error::Error>(error: &E) -> Self {
		Self::new(std::any::type_name::<E>(), error.to_string())
	}

	/// Captures a panic from inside a panic hook.
	pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
		Self {
			panicked: true,
			..Self::new(PANIC_CLASS, panic_message(info))
		}
	}

	pub fn class(&self) -> &str {
		&self.class
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn backtrace(&self) -> &Backtrace {
		&self.backtrace
	}

	/// Whether this error was captured by the panic hook.
	pub fn is_panic(&self) -> bool {
		self.panicked
	}

	/// Returns a copy with a different message, keeping the backtrace.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	/// Returns a copy with a different class, keeping the backtrace.
	pub fn with_class(mut self, class: impl Into<String>) -> Self {
		self.class = class.into();
		self
	}
}

impl fmt::Display for CapturedError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.class, self.message)
	}
}

/// Panic payloads are `&'static str` for literal messages and `String` for
/// formatted ones.
fn panic_message(info: &PanicHookInfo<'_>) -> String {
	let payload = info.payload();
	payload
		.downcast_ref::<&str>()
		.map(|message| message.to_string())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| String::from("panic with a non-string payload"))
}
