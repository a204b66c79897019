// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Suggested fixes attached to error reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A remediation suggestion produced by a solution provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
	/// Identifies the kind of solution, usually the provider's name.
	pub class: String,
	pub title: String,
	pub description: String,
	/// Label to URL.
	#[serde(default)]
	pub links: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub action_description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_runnable: Option<bool>,
}

impl Solution {
	pub fn new(
		class: impl Into<String>,
		title: impl Into<String>,
		description: impl Into<String>,
	) -> Self {
		Self {
			class: class.into(),
			title: title.into(),
			description: description.into(),
			links: BTreeMap::new(),
			action_description: None,
			is_runnable: None,
		}
	}

	pub fn with_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
		self.links.insert(label.into(), url.into());
		self
	}

	pub fn with_action_description(mut self, description: impl Into<String>) -> Self {
		self.action_description = Some(description.into());
		self
	}

	pub fn runnable(mut self, is_runnable: bool) -> Self {
		self.is_runnable = Some(is_runnable);
		self
	}
}
