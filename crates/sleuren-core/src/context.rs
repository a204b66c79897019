// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context attached to error reports.
//!
//! A context is a flat JSON object. Some top-level keys are reserved groups
//! that the collector understands:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `context` | Custom fields set by the host |
//! | `request` | `url`, `useragent`, `referrer`, `readyState` |
//! | `request_data` | `queryString` object |
//! | `cookies` | Cookie name to value |
//!
//! Any other key holds an arbitrary named group.

/// Contextual metadata, keyed by field or group name.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Group holding custom fields.
pub const CUSTOM_GROUP: &str = "context";
/// Group describing the current request or page.
pub const REQUEST_GROUP: &str = "request";
/// Group holding parsed request data.
pub const REQUEST_DATA_GROUP: &str = "request_data";
/// Group holding cookies.
pub const COOKIES_GROUP: &str = "cookies";

/// Copies every top-level entry of `source` into `target`.
///
/// Existing keys are overwritten. Nested objects are replaced, never merged.
pub fn merge_shallow(target: &mut Context, source: &Context) {
	for (key, value) in source {
		target.insert(key.clone(), value.clone());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn merge_replaces_nested_groups_wholesale() {
		let mut target = Context::new();
		target.insert(REQUEST_GROUP.into(), json!({"url": "a", "referrer": "b"}));

		let mut source = Context::new();
		source.insert(REQUEST_GROUP.into(), json!({"url": "c"}));

		merge_shallow(&mut target, &source);

		assert_eq!(target[REQUEST_GROUP], json!({"url": "c"}));
	}

	#[test]
	fn merge_keeps_disjoint_keys() {
		let mut target = Context::new();
		target.insert("a".into(), json!(1));

		let mut source = Context::new();
		source.insert("b".into(), json!(2));

		merge_shallow(&mut target, &source);

		assert_eq!(target.len(), 2);
		assert_eq!(target["a"], json!(1));
		assert_eq!(target["b"], json!(2));
	}
}
