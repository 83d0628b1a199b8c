// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end turn testing.
//!
//! `TestHarness` assembles a complete [`TurnOrchestrator`] over a scripted
//! [`MockProvider`], a manual clock, and JSON file storage in a temp
//! directory. `send_text()` and `send_voice()` drive one full turn.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};

use matbuddy_agent::{TurnOrchestrator, TurnOutcome};
use matbuddy_config::MatbuddyConfig;
use matbuddy_core::types::MessageContent;
use matbuddy_core::{ManualClock, MatbuddyError, StorageAdapter, UserRecord};
use matbuddy_storage::JsonFileStorage;

use crate::mock_provider::MockProvider;

const TEST_INSTRUCTION: &str = "You are a test training assistant.";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: MatbuddyConfig,
    start: Option<DateTime<Local>>,
    storage: Option<Arc<dyn StorageAdapter>>,
    provider: MockProvider,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: MatbuddyConfig::default(),
            start: None,
            storage: None,
            provider: MockProvider::new(),
        }
    }

    /// Adjust the configuration before the orchestrator is built.
    pub fn configure(mut self, f: impl FnOnce(&mut MatbuddyConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Start the manual clock at `start` instead of 2026-10-18 10:00.
    pub fn starting_at(mut self, start: DateTime<Local>) -> Self {
        self.start = Some(start);
        self
    }

    /// Use this storage instead of a temp-dir JSON store.
    pub fn with_storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use a provider the test already scripted.
    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, MatbuddyError> {
        let temp_dir = tempfile::TempDir::new().map_err(MatbuddyError::storage)?;
        let storage: Arc<dyn StorageAdapter> = match self.storage {
            Some(storage) => storage,
            None => {
                let storage = JsonFileStorage::at(temp_dir.path());
                storage.initialize().await?;
                Arc::new(storage)
            }
        };

        let start = self.start.unwrap_or_else(default_start);
        let clock = Arc::new(ManualClock::new(start));

        let orchestrator = Arc::new(TurnOrchestrator::new(
            &self.config,
            Arc::new(self.provider.clone()),
            storage.clone(),
            clock.clone(),
            TEST_INSTRUCTION.to_string(),
        ));

        Ok(TestHarness {
            orchestrator,
            provider: self.provider,
            storage,
            clock,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

fn default_start() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 10, 18, 10, 0, 0)
        .earliest()
        .unwrap_or_else(Local::now)
}

/// A complete turn pipeline with mock collaborators.
pub struct TestHarness {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub provider: MockProvider,
    pub storage: Arc<dyn StorageAdapter>,
    pub clock: Arc<ManualClock>,
    pub config: MatbuddyConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default harness with nothing scripted.
    pub async fn new() -> Result<Self, MatbuddyError> {
        Self::builder().build().await
    }

    /// The configured model candidates, cheapest first.
    pub fn models(&self) -> &[String] {
        &self.config.gemini.models
    }

    pub async fn send_text(&self, chat_id: i64, text: &str) -> TurnOutcome {
        self.orchestrator
            .handle(chat_id, &MessageContent::Text(text.to_string()))
            .await
    }

    pub async fn send_voice(&self, chat_id: i64, data: Vec<u8>) -> TurnOutcome {
        let voice = MessageContent::Voice {
            data,
            mime_type: "audio/ogg".to_string(),
        };
        self.orchestrator.handle(chat_id, &voice).await
    }

    pub async fn record(&self, chat_id: i64) -> Result<UserRecord, MatbuddyError> {
        self.storage.load(chat_id).await
    }

    pub async fn seed(&self, chat_id: i64, record: &UserRecord) -> Result<(), MatbuddyError> {
        self.storage.save(chat_id, record).await
    }
}
