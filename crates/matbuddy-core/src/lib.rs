// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for matbuddy.
//!
//! This crate provides the error type, the adapter traits, the shared
//! conversation types, and the explicit schema of the per-user record.

pub mod clock;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::MatbuddyError;
pub use record::{GlobalUsage, UserRecord};
pub use types::{AdapterType, HealthStatus, MessageId};

pub use traits::{ChannelAdapter, ChatHandle, PluginAdapter, ProviderAdapter, StorageAdapter};
