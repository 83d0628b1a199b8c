// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for matbuddy.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling, routing of text and voice messages, and plain-text
//! delivery.

pub mod handler;
pub mod media;

use std::sync::Arc;

use async_trait::async_trait;
use matbuddy_config::model::TelegramConfig;
use matbuddy_core::error::MatbuddyError;
use matbuddy_core::traits::{ChannelAdapter, PluginAdapter};
use matbuddy_core::types::{
    AdapterType, HealthStatus, InboundMessage, MessageContent, MessageId, OutboundMessage,
};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::handler::Route;

/// Sent in place of a turn when a voice note cannot be fetched.
pub const VOICE_DOWNLOAD_FAILED_REPLY: &str =
    "could not process that voice message. try again or type instead.";

const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// The token comes from `telegram.bot_token`, else `TELEGRAM_BOT_TOKEN`.
    pub fn new(config: TelegramConfig) -> Result<Self, MatbuddyError> {
        let token = resolve_token(&config)?;
        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn resolve_token(config: &TelegramConfig) -> Result<String, MatbuddyError> {
    let token = config
        .bot_token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .ok_or_else(|| {
            MatbuddyError::Config(format!("telegram.bot_token is required (or set {TOKEN_ENV})"))
        })?;
    if token.trim().is_empty() {
        return Err(MatbuddyError::Config("telegram.bot_token cannot be empty".into()));
    }
    Ok(token)
}

/// Turns one update into at most one inbound message.
///
/// A voice note that fails to download is answered here and never
/// forwarded.
async fn forward(bot: &Bot, msg: &Message, allowed: &[String], tx: &mpsc::Sender<InboundMessage>) {
    if !handler::is_dm(msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return;
    }
    if !handler::is_authorized(msg, allowed) {
        debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
        return;
    }

    let content = match handler::route(msg) {
        Route::Text(text) => MessageContent::Text(text.to_string()),
        Route::Voice(voice) => match media::extract_voice_content(bot, voice).await {
            Ok(content) => content,
            Err(e) => {
                warn!(chat_id = msg.chat.id.0, error = %e, "voice download failed");
                if let Err(e) = bot.send_message(msg.chat.id, VOICE_DOWNLOAD_FAILED_REPLY).await {
                    warn!(chat_id = msg.chat.id.0, error = %e, "failed to report voice failure");
                }
                return;
            }
        },
        Route::Ignore => {
            debug!(msg_id = msg.id.0, "ignoring message");
            return;
        }
    };

    if tx.send(handler::to_inbound_message(msg, content)).await.is_err() {
        warn!("inbound channel closed, dropping message");
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, MatbuddyError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Telegram bot unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), MatbuddyError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), MatbuddyError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let allowed: Arc<Vec<String>> = Arc::new(self.config.allowed_users.clone());
        if allowed.is_empty() {
            info!("telegram.allowed_users is empty, every user may chat");
        }

        info!("starting Telegram long polling");
        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let tx = tx.clone();
                let allowed = allowed.clone();
                async move {
                    forward(&bot, &msg, &allowed, &tx).await;
                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, MatbuddyError> {
        let sent = self
            .bot
            .send_message(ChatId(msg.chat_id), &msg.content)
            .await
            .map_err(|e| MatbuddyError::Channel {
                message: format!("failed to send message: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundMessage, MatbuddyError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| MatbuddyError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), MatbuddyError> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map_err(|e| MatbuddyError::Channel {
                message: format!("failed to send typing indicator: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}
