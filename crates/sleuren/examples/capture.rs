// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: report an error and a message with the Sleuren client.
//!
//! Run with:
//!   SLEUREN_KEY=... cargo run --example capture -p sleuren

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sleuren::{
	CapturedError, ClientConfig, ExtraParameters, MessageLevel, RequestCollector, Result,
	SleurenClient, Solution, SolutionProvider,
};
use tracing_subscriber::EnvFilter;

struct MissingFileProvider;

#[async_trait]
impl SolutionProvider for MissingFileProvider {
	async fn can_solve(&self, error: &CapturedError, _: &ExtraParameters) -> Result<bool> {
		Ok(error.message().contains("No such file"))
	}

	async fn get_solutions(&self, _: &CapturedError, _: &ExtraParameters) -> Result<Vec<Solution>> {
		Ok(vec![Solution::new(
			"MissingFile",
			"Create the configuration file",
			"Copy settings.example.toml to settings.toml.",
		)
		.with_link("Configuration guide", "https://sleuren.com/docs")])
	}
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sleuren=debug")))
		.init();

	let config = ClientConfig::from_env();
	println!("Initializing Sleuren client...");
	println!("  Reporting URL: {}", config.reporting_url);
	println!("  Key configured: {}", config.api_key().is_some());

	let client = SleurenClient::builder()
		.config(config)
		.stage("development")
		.debug(true)
		.solution_provider(MissingFileProvider)
		.context_collector(RequestCollector::new("https://example.test/settings").with_user_agent("capture-example"))
		.build()?;

	client.install_panic_hook();

	client.glow("startup", MessageLevel::Info, Vec::new()).await;
	client
		.glow("loading settings", MessageLevel::Debug, vec![json!({"path": "settings.toml"})])
		.await;
	client.add_context("example", json!(true)).await;

	if let Err(e) = tokio::fs::read_to_string("settings.toml").await {
		println!("\nReporting error: {e}");
		client.report(CapturedError::from_error(&e)).await;
	}

	println!("Reporting message...");
	client.report_message("Example message from the Sleuren client").await;

	// Submission happens in the background.
	tokio::time::sleep(Duration::from_secs(2)).await;
	println!("Done.");

	Ok(())
}
