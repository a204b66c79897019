// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Sleuren error capture client.
//!
//! This crate holds the report model shared by the client SDK (`sleuren`)
//! and anything that consumes its submissions: glows (breadcrumbs), context
//! maps, solutions, stack frames and the error report itself.

pub mod context;
pub mod error;
pub mod glow;
pub mod report;
pub mod solution;

pub use context::{
	merge_shallow, Context, COOKIES_GROUP, CUSTOM_GROUP, REQUEST_DATA_GROUP, REQUEST_GROUP,
};
pub use error::CoreError;
pub use glow::{Glow, MessageLevel};
pub use report::{ErrorReport, StackFrame, LANGUAGE};
pub use solution::Solution;
