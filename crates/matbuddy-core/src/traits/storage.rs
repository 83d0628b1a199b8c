// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for per-user records and the global usage counter.

use async_trait::async_trait;

use crate::error::MatbuddyError;
use crate::record::{GlobalUsage, UserRecord};
use crate::traits::adapter::PluginAdapter;

/// Adapter for the key-value persistence collaborator.
///
/// Records are keyed by chat id. A missing record loads as
/// [`UserRecord::default`]; stored records are migrated on read.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Prepares the backend (creates directories and the like).
    async fn initialize(&self) -> Result<(), MatbuddyError>;

    async fn load(&self, user_id: i64) -> Result<UserRecord, MatbuddyError>;

    async fn save(&self, user_id: i64, record: &UserRecord) -> Result<(), MatbuddyError>;

    /// Returns the stored global counter, if one was ever written.
    async fn load_global_usage(&self) -> Result<Option<GlobalUsage>, MatbuddyError>;

    async fn save_global_usage(&self, usage: &GlobalUsage) -> Result<(), MatbuddyError>;
}
