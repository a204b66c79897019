// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sliding-window admission control for report submissions.

use std::collections::VecDeque;

/// Length of the rate-limit window.
pub const WINDOW_MILLIS: i64 = 60_000;

/// Bounds the number of reports dispatched in any trailing 60 second window.
///
/// The limiter keeps the timestamps of dispatched reports. A new submission
/// is rejected when the timestamp `max_per_window` positions back from the
/// most recent one is still inside the window. Rejected submissions are
/// dropped by the caller; nothing is queued.
#[derive(Debug, Clone)]
pub struct RateLimiter {
	max_per_window: usize,
	timestamps: VecDeque<i64>,
}

impl RateLimiter {
	/// Creates a limiter allowing `max_per_window` dispatches per minute.
	///
	/// A limit of zero disables throttling.
	pub fn new(max_per_window: usize) -> Self {
		Self {
			max_per_window,
			timestamps: VecDeque::with_capacity(max_per_window.min(1024)),
		}
	}

	/// Returns true if a submission at `now_millis` must be dropped.
	pub fn is_limited(&self, now_millis: i64) -> bool {
		let max = self.max_per_window;
		if max == 0 || self.timestamps.len() < max {
			return false;
		}

		let boundary = self.timestamps[self.timestamps.len() - max];
		boundary > now_millis - WINDOW_MILLIS
	}

	/// Changes the limit, discarding history that can no longer matter.
	pub fn set_max_per_window(&mut self, max_per_window: usize) {
		self.max_per_window = max_per_window;
		self.trim();
	}

	/// Records a dispatch at `at_millis`.
	///
	/// Only the most recent `max_per_window` entries can influence a later
	/// decision, so older ones are discarded.
	pub fn record(&mut self, at_millis: i64) {
		self.timestamps.push_back(at_millis);
		self.trim();
	}

	/// Number of retained timestamps.
	pub fn len(&self) -> usize {
		self.timestamps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.timestamps.is_empty()
	}

	fn trim(&mut self) {
		while self.timestamps.len() > self.max_per_window {
			self.timestamps.pop_front();
		}
	}
}
