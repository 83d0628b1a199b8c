// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound messages for assertion in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use matbuddy_core::error::MatbuddyError;
use matbuddy_core::types::{
    AdapterType, HealthStatus, InboundMessage, MessageContent, MessageId, OutboundMessage,
};
use matbuddy_core::{ChannelAdapter, PluginAdapter};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
///
/// Once `close()` is called and the inbound queue is empty, `receive()`
/// reports a closed channel.
#[derive(Default)]
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    typing: Arc<Mutex<Vec<i64>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    next_id: AtomicU64,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Shorthand for injecting a text message.
    pub async fn inject_text(&self, chat_id: i64, text: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.inject_message(InboundMessage {
            id: format!("in-{id}"),
            chat_id,
            content: MessageContent::Text(text.to_string()),
            timestamp: String::new(),
        })
        .await;
    }

    /// Stop delivering once the queue drains.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Chats that received a typing indicator, in order.
    pub async fn typing_chats(&self) -> Vec<i64> {
        self.typing.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, MatbuddyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MatbuddyError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), MatbuddyError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, MatbuddyError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{id}")))
    }

    async fn receive(&self) -> Result<InboundMessage, MatbuddyError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(MatbuddyError::Channel {
                    message: "mock channel closed".into(),
                    source: None,
                });
            }
            self.notify.notified().await;
        }
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), MatbuddyError> {
        self.typing.lock().await.push(chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inject_and_receive() {
        let channel = MockChannel::new();
        channel.inject_text(5, "hello").await;
        let msg = channel.receive().await.unwrap();
        assert_eq!(msg.chat_id, 5);
        assert_eq!(msg.content, MessageContent::Text("hello".into()));
    }

    #[tokio::test]
    async fn send_captures_messages() {
        let channel = MockChannel::new();
        channel
            .send(OutboundMessage {
                chat_id: 5,
                content: "oss".into(),
            })
            .await
            .unwrap();
        assert_eq!(channel.sent_count().await, 1);
        assert_eq!(channel.sent_messages().await[0].content, "oss");
    }

    #[tokio::test]
    async fn closed_channel_drains_then_errors() {
        let channel = MockChannel::new();
        channel.inject_text(1, "last").await;
        channel.close();
        assert!(channel.receive().await.is_ok());
        let err = channel.receive().await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
