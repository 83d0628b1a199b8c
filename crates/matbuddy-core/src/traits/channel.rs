// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging platform integrations.

use async_trait::async_trait;

use crate::error::MatbuddyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundMessage, MessageId, OutboundMessage};

/// Adapter for bidirectional messaging channel integrations.
///
/// Channel adapters connect matbuddy to a messaging platform, handling
/// message ingestion (including media download) and delivery.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), MatbuddyError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, MatbuddyError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, MatbuddyError>;

    /// Shows a typing indicator in the chat. Best effort.
    async fn send_typing(&self, _chat_id: i64) -> Result<(), MatbuddyError> {
        Ok(())
    }
}
