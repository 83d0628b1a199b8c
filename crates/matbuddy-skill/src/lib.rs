// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools the assistant can use, and the data behind them.
//!
//! The tool set is closed: [`ToolName`] enumerates it and [`ToolCall`] is the
//! typed form of a model's request. Read tools are resolved ahead of time and
//! injected as context; action tools are exposed to the model. Executors never
//! fail outward: every problem becomes result text the model can react to.

pub mod builtin;
pub mod call;
pub mod catalog;
pub mod tool;

pub use call::{ToolCall, ToolCallError};
pub use catalog::{catalog, find_techniques_in_text, Catalog, Category, Technique};
pub use tool::{ToolName, ToolRegistry};

/// Line prefix tool results use to hand verified links to the tool-call loop.
pub const VIDEO_URL_MARKER: &str = "EXACT_VIDEO_URL:";
