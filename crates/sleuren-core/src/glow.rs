// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Glows: breadcrumbs recorded by the host before an error is reported.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A timestamped, leveled entry attached to the next error report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glow {
	/// Wall clock at creation, milliseconds since the Unix epoch.
	pub time: i64,
	/// Wall clock at creation, microseconds since the Unix epoch.
	///
	/// Sampled separately from `time`; the two are not guaranteed to agree.
	pub microtime: i64,
	pub name: String,
	pub message_level: MessageLevel,
	pub meta_data: Vec<serde_json::Value>,
}

impl Glow {
	/// Creates a glow stamped with the current time.
	pub fn new(
		name: impl Into<String>,
		message_level: MessageLevel,
		meta_data: Vec<serde_json::Value>,
	) -> Self {
		let time = Utc::now().timestamp_millis();
		let microtime = Utc::now().timestamp_micros();

		Self {
			time,
			microtime,
			name: name.into(),
			message_level,
			meta_data,
		}
	}
}

/// Severity level of a glow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
	#[default]
	Info,
	Debug,
	Warning,
	Error,
	Critical,
}

impl fmt::Display for MessageLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Info => write!(f, "info"),
			Self::Debug => write!(f, "debug"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Critical => write!(f, "critical"),
		}
	}
}

impl FromStr for MessageLevel {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"info" => Ok(Self::Info),
			"debug" => Ok(Self::Debug),
			"warning" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"critical" => Ok(Self::Critical),
			_ => Err(CoreError::InvalidMessageLevel(s.to_string())),
		}
	}
}
