// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI message quotas.
//!
//! Two independent budgets gate every assistant turn: a per-user daily count
//! kept inside the user's record, and a deployment-wide monthly count kept in
//! its own file. Both reset lazily when the stored period is stale. Usage is
//! only ever recorded after a reply was produced.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use matbuddy_config::model::QuotaConfig;
use matbuddy_core::record::{GlobalUsage, UserRecord};
use matbuddy_core::{Clock, MatbuddyError, StorageAdapter};

/// Daily and monthly message counters backed by the storage collaborator.
pub struct QuotaMeter {
    daily_limit: u32,
    monthly_limit: u64,
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write of the shared global counter file.
    global_lock: Mutex<()>,
}

impl QuotaMeter {
    pub fn new(config: &QuotaConfig, storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            daily_limit: config.daily_limit,
            monthly_limit: config.monthly_global_limit,
            storage,
            clock,
            global_lock: Mutex::new(()),
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Messages the user may still send today.
    ///
    /// A stale date counts as zero usage; nothing is written until
    /// [`QuotaMeter::increment`].
    pub fn remaining(&self, record: &UserRecord) -> u32 {
        if record.ai_usage.date != self.clock.today() {
            return self.daily_limit;
        }
        self.daily_limit.saturating_sub(record.ai_usage.count)
    }

    /// Counts one message against `record`, resetting a stale day first.
    ///
    /// Returns the new count. Only mutates; see [`QuotaMeter::increment`].
    pub fn record_use(&self, record: &mut UserRecord) -> u32 {
        let today = self.clock.today();
        if record.ai_usage.date != today {
            record.ai_usage.date = today;
            record.ai_usage.count = 0;
        }
        record.ai_usage.count += 1;
        record.ai_usage.count
    }

    /// Re-reads the user's record, counts one message, applies `also` and
    /// persists everything in a single write.
    ///
    /// The record is re-read because the caller suspended on a provider call
    /// since its last look.
    pub async fn increment<F>(&self, user_id: i64, also: F) -> Result<u32, MatbuddyError>
    where
        F: FnOnce(&mut UserRecord) + Send,
    {
        let mut record = self.storage.load(user_id).await?;
        let count = self.record_use(&mut record);
        also(&mut record);
        self.storage.save(user_id, &record).await?;
        debug!(user_id, count, limit = self.daily_limit, "daily usage recorded");
        Ok(count)
    }

    /// True once the deployment has used its monthly budget.
    pub async fn global_exceeded(&self) -> Result<bool, MatbuddyError> {
        let usage = self.current_global().await?;
        if usage.count >= self.monthly_limit {
            return Ok(true);
        }
        if usage.count * 5 >= self.monthly_limit * 4 {
            warn!(
                count = usage.count,
                limit = self.monthly_limit,
                "approaching monthly AI budget (80%+)"
            );
        }
        Ok(false)
    }

    /// Counts one message against the monthly budget and returns the new total.
    pub async fn global_increment(&self) -> Result<u64, MatbuddyError> {
        let _guard = self.global_lock.lock().await;
        let mut usage = self.current_global().await?;
        usage.count += 1;
        self.storage.save_global_usage(&usage).await?;
        Ok(usage.count)
    }

    /// Stored global usage, or a zeroed record for the current month.
    async fn current_global(&self) -> Result<GlobalUsage, MatbuddyError> {
        let month = self.clock.month();
        match self.storage.load_global_usage().await? {
            Some(usage) if usage.month == month => Ok(usage),
            _ => Ok(GlobalUsage { month, count: 0 }),
        }
    }
}
