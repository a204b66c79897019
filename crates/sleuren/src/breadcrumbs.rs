// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded log of glows attached to the next report.

use std::collections::VecDeque;

use sleuren_core::{Glow, MessageLevel};

/// Insertion-ordered ring buffer of glows.
///
/// Once the log holds more than `capacity` entries the oldest are evicted.
/// Reports take a [`snapshot`](Self::snapshot), never a live reference.
#[derive(Debug, Clone)]
pub struct BreadcrumbLog {
	capacity: usize,
	glows: VecDeque<Glow>,
}

impl BreadcrumbLog {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			glows: VecDeque::with_capacity(capacity.min(1024)),
		}
	}

	/// Records a glow stamped with the current time.
	pub fn record(
		&mut self,
		name: impl Into<String>,
		level: MessageLevel,
		meta_data: Vec<serde_json::Value>,
	) {
		self.push(Glow::new(name, level, meta_data));
	}

	/// Appends an existing glow, evicting the oldest entries over capacity.
	pub fn push(&mut self, glow: Glow) {
		self.glows.push_back(glow);
		self.trim();
	}

	/// Changes the capacity, evicting immediately if the log is now too long.
	pub fn set_capacity(&mut self, capacity: usize) {
		self.capacity = capacity;
		self.trim();
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Copies the current glows, oldest first.
	pub fn snapshot(&self) -> Vec<Glow> {
		self.glows.iter().cloned().collect()
	}

	pub fn clear(&mut self) {
		self.glows.clear();
	}

	pub fn len(&self) -> usize {
		self.glows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.glows.is_empty()
	}

	fn trim(&mut self) {
		while self.glows.len() > self.capacity {
			self.glows.pop_front();
		}
	}
}
