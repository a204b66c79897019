// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration for automatic error reporting.

use std::panic::PanicHookInfo;

use tokio::runtime::Handle;

use crate::captured::CapturedError;
use crate::client::{in_pipeline, SleurenClient};
use crate::diagnostics::check;

/// Install a panic hook that reports panics through `client`.
///
/// The existing hook is kept and called after the report is queued. Panics
/// raised by the report pipeline itself are not reported.
pub fn install_panic_hook(client: SleurenClient) {
	let default_hook = std::panic::take_hook();
	let install_handle = Handle::try_current().ok();

	std::panic::set_hook(Box::new(move |info| {
		if !in_pipeline() {
			report_panic(&client, install_handle.as_ref(), info);
		}

		default_hook(info);
	}));
}

/// Queues a report for the panic on a tokio runtime.
///
/// The panicking thread's runtime is preferred; otherwise the runtime that
/// was current when the hook was installed.
fn report_panic(client: &SleurenClient, fallback: Option<&Handle>, info: &PanicHookInfo<'_>) {
	let error = CapturedError::from_panic(info);

	let handle = match Handle::try_current() {
		Ok(handle) => handle,
		Err(_) => match fallback {
			Some(handle) => handle.clone(),
			None => {
				check(
					false,
					&format!("No tokio runtime available to report panic: {error}"),
					client.is_debug(),
				);
				return;
			}
		},
	};

	let client = client.clone();
	handle.spawn(async move { client.report(error).await });
}
