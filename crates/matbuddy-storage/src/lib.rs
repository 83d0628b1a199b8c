// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file persistence for matbuddy.
//!
//! One pretty-printed `user_<chat_id>.json` per user plus a single
//! `global_ai_usage.json`, the layout the bot's command handlers also read.
//! Writes go through a temp file and a rename so a crash never leaves a
//! truncated record behind.

pub mod adapter;

pub use adapter::JsonFileStorage;
