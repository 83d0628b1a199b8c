// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for matbuddy integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted model provider, one step queue per model
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`MockStorage`] - In-memory user records with switchable failures
//! - [`TestHarness`] - A full turn orchestrator over temp-dir storage

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;
pub mod mock_storage;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use matbuddy_core::ManualClock;
pub use mock_channel::MockChannel;
pub use mock_provider::{MockProvider, Step, StubChat};
pub use mock_storage::MockStorage;
