// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool executors.
//!
//! Every result ends with a `COMMAND:` line naming the slash command that
//! best continues the conversation outside the assistant.

pub mod notes;
pub mod overview;
pub mod techniques;
