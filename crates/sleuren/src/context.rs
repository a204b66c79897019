// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistent report context and environment collectors.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sleuren_core::{
	merge_shallow, Context, COOKIES_GROUP, CUSTOM_GROUP, REQUEST_DATA_GROUP, REQUEST_GROUP,
};
use url::Url;

use crate::error::{Result, SleurenError};

/// Context that persists across reports for the life of the client.
#[derive(Debug, Clone)]
pub struct ContextStore {
	values: Context,
}

impl Default for ContextStore {
	fn default() -> Self {
		Self::new()
	}
}

impl ContextStore {
	/// Creates a store holding an empty custom field group.
	pub fn new() -> Self {
		let mut values = Context::new();
		values.insert(CUSTOM_GROUP.to_string(), Value::Object(Context::new()));
		Self { values }
	}

	/// Sets a custom field, replacing any previous value for `name`.
	pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
		let group = self
			.values
			.entry(CUSTOM_GROUP)
			.or_insert_with(|| Value::Object(Context::new()));

		if !group.is_object() {
			*group = Value::Object(Context::new());
		}
		if let Value::Object(fields) = group {
			fields.insert(name.into(), value);
		}
	}

	/// Replaces a whole named group.
	pub fn set_group(&mut self, group: impl Into<String>, value: Value) {
		self.values.insert(group.into(), value);
	}

	/// Copies the stored context.
	pub fn snapshot(&self) -> Context {
		self.values.clone()
	}

	/// Merges context sources into a new map.
	///
	/// Collector outputs are applied first in order, then the ad hoc context
	/// passed with a report, then the persistent store, so the store wins on
	/// conflicting keys. Merging is shallow.
	pub fn merge(collected: &[Context], ad_hoc: &Context, persistent: &Context) -> Context {
		let mut merged = Context::new();
		for source in collected {
			merge_shallow(&mut merged, source);
		}
		merge_shallow(&mut merged, ad_hoc);
		merge_shallow(&mut merged, persistent);
		merged
	}
}

/// Supplies context describing the environment at report time.
///
/// Collectors run synchronously while a report is assembled, so they should
/// only read state that is already at hand.
pub trait ContextCollector: Send + Sync {
	fn collect(&self) -> Context;
}

impl<F> ContextCollector for F
where
	F: Fn() -> Context + Send + Sync,
{
	fn collect(&self) -> Context {
		self()
	}
}

/// Parses a `Cookie` header into the `cookies` group.
#[derive(Debug, Clone)]
pub struct CookieCollector {
	header: String,
}

impl CookieCollector {
	pub fn new(header: impl Into<String>) -> Self {
		Self {
			header: header.into(),
		}
	}
}

impl ContextCollector for CookieCollector {
	fn collect(&self) -> Context {
		let cookies: BTreeMap<&str, &str> = self
			.header
			.split(';')
			.filter_map(|pair| {
				let (name, value) = pair.split_once('=')?;
				let name = name.trim();
				(!name.is_empty()).then(|| (name, value.trim()))
			})
			.collect();

		let mut context = Context::new();
		if !cookies.is_empty() {
			context.insert(COOKIES_GROUP.to_string(), json!(cookies));
		}
		context
	}
}

/// Describes the page or request being served into the `request` group.
#[derive(Debug, Clone, Default)]
pub struct RequestCollector {
	url: Option<String>,
	user_agent: Option<String>,
	referrer: Option<String>,
	ready_state: Option<String>,
}

impl RequestCollector {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: Some(url.into()),
			..Self::default()
		}
	}

	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}

	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = Some(referrer.into());
		self
	}

	pub fn with_ready_state(mut self, ready_state: impl Into<String>) -> Self {
		self.ready_state = Some(ready_state.into());
		self
	}
}

impl ContextCollector for RequestCollector {
	fn collect(&self) -> Context {
		let mut request = Context::new();
		let fields = [
			("url", &self.url),
			("useragent", &self.user_agent),
			("referrer", &self.referrer),
			("readyState", &self.ready_state),
		];
		for (key, value) in fields {
			if let Some(value) = value {
				request.insert(key.to_string(), Value::String(value.clone()));
			}
		}

		let mut context = Context::new();
		if !request.is_empty() {
			context.insert(REQUEST_GROUP.to_string(), Value::Object(request));
		}
		context
	}
}

/// Parses a URL's query string into `request_data.queryString`.
#[derive(Debug, Clone)]
pub struct QueryStringCollector {
	url: Url,
}

impl QueryStringCollector {
	pub fn new(url: &str) -> Result<Self> {
		let url = Url::parse(url).map_err(|e| SleurenError::InvalidUrl(e.to_string()))?;
		Ok(Self { url })
	}
}

impl ContextCollector for QueryStringCollector {
	fn collect(&self) -> Context {
		let query: BTreeMap<String, String> = self
			.url
			.query_pairs()
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect();

		let mut context = Context::new();
		if !query.is_empty() {
			context.insert(
				REQUEST_DATA_GROUP.to_string(),
				json!({ "queryString": query }),
			);
		}
		context
	}
}
