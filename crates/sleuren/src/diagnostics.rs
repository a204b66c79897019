// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Debug-gated diagnostics.
//!
//! Faults inside the client never change control flow for the host. When the
//! client runs in debug mode they are logged at `warn`, otherwise at `trace`.

use tracing::{trace, warn};

/// Logs `message` when `condition` does not hold and returns `condition`.
pub(crate) fn check(condition: bool, message: &str, debug: bool) -> bool {
	if !condition {
		if debug {
			warn!(target: "sleuren", "{message}");
		} else {
			trace!(target: "sleuren", "{message}");
		}
	}

	condition
}
