// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed implementation of the StorageAdapter trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use matbuddy_config::model::StorageConfig;
use matbuddy_core::record::{GlobalUsage, UserRecord};
use matbuddy_core::{AdapterType, HealthStatus, MatbuddyError, PluginAdapter, StorageAdapter};

const GLOBAL_USAGE_FILE: &str = "global_ai_usage.json";

/// Stores each user's record as a JSON file under one data directory.
///
/// All writes are serialized through `write_lock`, so two saves never
/// interleave their temp-file/rename steps.
pub struct JsonFileStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self::at(&config.data_dir)
    }

    /// Storage rooted at an explicit directory.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn user_path(&self, user_id: i64) -> PathBuf {
        self.dir.join(format!("user_{user_id}.json"))
    }

    fn global_path(&self) -> PathBuf {
        self.dir.join(GLOBAL_USAGE_FILE)
    }

    async fn read_json(path: &Path) -> Result<Option<serde_json::Value>, MatbuddyError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(MatbuddyError::storage),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MatbuddyError::storage(e)),
        }
    }

    async fn write_json(&self, path: &Path, bytes: Vec<u8>) -> Result<(), MatbuddyError> {
        let _guard = self.write_lock.lock().await;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(MatbuddyError::storage)?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(MatbuddyError::storage)
    }
}

#[async_trait]
impl PluginAdapter for JsonFileStorage {
    fn name(&self) -> &str {
        "json-file"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MatbuddyError> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.dir.display()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), MatbuddyError> {
        // Waits out any in-flight write.
        let _guard = self.write_lock.lock().await;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStorage {
    async fn initialize(&self) -> Result<(), MatbuddyError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(MatbuddyError::storage)?;
        debug!(dir = %self.dir.display(), "json storage initialized");
        Ok(())
    }

    async fn load(&self, user_id: i64) -> Result<UserRecord, MatbuddyError> {
        match Self::read_json(&self.user_path(user_id)).await? {
            Some(value) => UserRecord::from_value(value).map_err(MatbuddyError::storage),
            None => Ok(UserRecord::default()),
        }
    }

    async fn save(&self, user_id: i64, record: &UserRecord) -> Result<(), MatbuddyError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(MatbuddyError::storage)?;
        self.write_json(&self.user_path(user_id), bytes).await
    }

    async fn load_global_usage(&self) -> Result<Option<GlobalUsage>, MatbuddyError> {
        Self::read_json(&self.global_path())
            .await?
            .map(|value| serde_json::from_value(value).map_err(MatbuddyError::storage))
            .transpose()
    }

    async fn save_global_usage(&self, usage: &GlobalUsage) -> Result<(), MatbuddyError> {
        let bytes = serde_json::to_vec(usage).map_err(MatbuddyError::storage)?;
        self.write_json(&self.global_path(), bytes).await
    }
}
