// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational assistant orchestration for matbuddy.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives messages from a channel adapter
//! - Runs each through the [`TurnOrchestrator`], one turn at a time per chat
//! - Sends exactly one reply per message back through the channel
//! - Drains in-flight turns on shutdown

pub mod confirm;
pub mod context;
pub mod session;
pub mod shutdown;
pub mod tool_loop;
pub mod turn;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use matbuddy_core::error::MatbuddyError;
use matbuddy_core::types::{InboundMessage, OutboundMessage};
use matbuddy_core::ChannelAdapter;

pub use session::{Session, SessionStore};
pub use turn::{TurnOrchestrator, TurnOutcome, TurnState};

/// How long in-flight turns may run after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pulls messages off a channel and answers each one.
pub struct AgentLoop {
    channel: Arc<dyn ChannelAdapter>,
    orchestrator: Arc<TurnOrchestrator>,
    /// One lock per chat with a turn in flight.
    chat_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
    drain_timeout: Duration,
}

impl AgentLoop {
    pub fn new(channel: Arc<dyn ChannelAdapter>, orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            channel,
            orchestrator,
            chat_locks: Arc::new(DashMap::new()),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Runs until the token is cancelled or the channel closes.
    ///
    /// Each message is handled on its own task; turns of the same chat are
    /// serialized.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MatbuddyError> {
        info!("agent loop running");
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => {
                            let channel = self.channel.clone();
                            let orchestrator = self.orchestrator.clone();
                            let locks = self.chat_locks.clone();
                            tracker.spawn(async move {
                                handle_inbound(channel.as_ref(), &orchestrator, &locks, inbound).await;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        shutdown::drain_turns(&tracker, self.drain_timeout).await;
        if let Err(e) = self.channel.shutdown().await {
            debug!(error = %e, "channel shutdown failed");
        }
        info!("agent loop stopped");
        Ok(())
    }

    /// Handles one message in place. Exposed for tests and single-shot use.
    pub async fn handle_one(&self, inbound: InboundMessage) {
        handle_inbound(self.channel.as_ref(), &self.orchestrator, &self.chat_locks, inbound).await;
    }
}

async fn handle_inbound(
    channel: &dyn ChannelAdapter,
    orchestrator: &TurnOrchestrator,
    locks: &DashMap<i64, Arc<Mutex<()>>>,
    inbound: InboundMessage,
) {
    let chat_id = inbound.chat_id;
    let lock = locks.entry(chat_id).or_default().clone();
    {
        let _turn = lock.lock().await;

        let outcome = orchestrator
            .handle_on(Some(channel), chat_id, &inbound.content)
            .await;
        let out = OutboundMessage {
            chat_id,
            content: outcome.reply,
        };
        if let Err(e) = channel.send(out).await {
            error!(chat_id, error = %e, "failed to deliver reply");
        }
    }
    drop(lock);
    locks.remove_if(&chat_id, |_, l| Arc::strong_count(l) == 1);
}
