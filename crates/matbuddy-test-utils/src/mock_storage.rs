// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter for tests that need to break persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use matbuddy_core::error::MatbuddyError;
use matbuddy_core::types::{AdapterType, HealthStatus};
use matbuddy_core::{GlobalUsage, PluginAdapter, StorageAdapter, UserRecord};

#[derive(Default)]
struct Inner {
    records: HashMap<i64, UserRecord>,
    global: Option<GlobalUsage>,
}

/// Records kept in a map. Clones share the same map.
#[derive(Clone, Default)]
pub struct MockStorage {
    inner: Arc<Mutex<Inner>>,
    failing: Arc<AtomicBool>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// While set, every load and save fails with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn insert(&self, user_id: i64, record: UserRecord) {
        self.inner().records.insert(user_id, record);
    }

    /// The stored record, or a fresh one.
    pub fn record(&self, user_id: i64) -> UserRecord {
        self.inner().records.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn global(&self) -> Option<GlobalUsage> {
        self.inner().global.clone()
    }

    fn check(&self) -> Result<(), MatbuddyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MatbuddyError::storage(std::io::Error::other(
                "mock storage unavailable",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockStorage {
    fn name(&self) -> &str {
        "mock-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MatbuddyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MatbuddyError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MockStorage {
    async fn initialize(&self) -> Result<(), MatbuddyError> {
        self.check()
    }

    async fn load(&self, user_id: i64) -> Result<UserRecord, MatbuddyError> {
        self.check()?;
        Ok(self.record(user_id))
    }

    async fn save(&self, user_id: i64, record: &UserRecord) -> Result<(), MatbuddyError> {
        self.check()?;
        self.insert(user_id, record.clone());
        Ok(())
    }

    async fn load_global_usage(&self) -> Result<Option<GlobalUsage>, MatbuddyError> {
        self.check()?;
        Ok(self.global())
    }

    async fn save_global_usage(&self, usage: &GlobalUsage) -> Result<(), MatbuddyError> {
        self.check()?;
        self.inner().global = Some(usage.clone());
        Ok(())
    }
}
