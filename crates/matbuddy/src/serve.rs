// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `matbuddy serve` command implementation.
//!
//! Wires JSON file storage, the Gemini provider, and the Telegram channel
//! into a turn orchestrator and runs the agent loop until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use matbuddy_agent::{context, shutdown, AgentLoop, TurnOrchestrator};
use matbuddy_config::MatbuddyConfig;
use matbuddy_core::error::MatbuddyError;
use matbuddy_core::{ChannelAdapter, StorageAdapter, SystemClock};
use matbuddy_gemini::GeminiProvider;
use matbuddy_storage::JsonFileStorage;
use matbuddy_telegram::TelegramChannel;
use tracing::{debug, error, info};

/// How often idle sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub async fn run_serve(config: MatbuddyConfig) -> Result<(), MatbuddyError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting matbuddy serve");

    let storage = JsonFileStorage::new(&config.storage);
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
    info!(data_dir = %config.storage.data_dir, "storage ready");

    let provider = GeminiProvider::new(&config.gemini).map_err(|e| {
        error!(error = %e, "failed to initialize Gemini provider");
        eprintln!("error: Gemini API key required. Set gemini.api_key or the GEMINI_API_KEY env var");
        e
    })?;

    let mut channel = TelegramChannel::new(config.telegram.clone()).map_err(|e| {
        error!(error = %e, "failed to initialize Telegram channel");
        eprintln!("error: Telegram bot token required. Set telegram.bot_token or the TELEGRAM_BOT_TOKEN env var");
        e
    })?;
    channel.connect().await?;
    let channel: Arc<dyn ChannelAdapter> = Arc::new(channel);

    let instruction = context::load_system_prompt(&config.agent).await;
    let orchestrator = Arc::new(TurnOrchestrator::new(
        &config,
        Arc::new(provider),
        storage,
        Arc::new(SystemClock),
        instruction,
    ));
    info!(models = ?config.gemini.models, "model candidates");

    let cancel = shutdown::install_signal_handler();

    {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            // Skip the first immediate tick.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        orchestrator.sessions().evict_stale();
                    }
                    _ = cancel.cancelled() => {
                        debug!("session sweeper shutting down");
                        break;
                    }
                }
            }
        });
    }

    AgentLoop::new(channel, orchestrator).run(cancel).await?;

    info!("matbuddy serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("matbuddy={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
