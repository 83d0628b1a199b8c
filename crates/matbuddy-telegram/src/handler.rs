// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing and authorization filtering.
//!
//! Decides whether an incoming Telegram message belongs to the assistant
//! and converts the ones that do into an [`InboundMessage`].

use matbuddy_core::types::{InboundMessage, MessageContent};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, Voice};

/// What the assistant does with an incoming message.
#[derive(Debug)]
pub enum Route<'a> {
    Text(&'a str),
    Voice(&'a Voice),
    /// Commands, empty text, and unsupported media.
    Ignore,
}

/// Slash commands are served by the command menu, not the assistant.
pub fn route(msg: &Message) -> Route<'_> {
    if let Some(text) = msg.text() {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('/') {
            return Route::Ignore;
        }
        return Route::Text(text);
    }
    match msg.voice() {
        Some(voice) => Route::Voice(voice),
        None => Route::Ignore,
    }
}

/// Checks whether the message sender is authorized.
///
/// An empty `allowed_users` list lets everyone in. Otherwise the sender's
/// user ID or username (with or without `@`) must be listed.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return true;
    }

    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    let user_id = user.id.0.to_string();

    allowed_users.iter().any(|allowed| {
        if *allowed == user_id {
            return true;
        }
        let clean = allowed.strip_prefix('@').unwrap_or(allowed);
        user.username
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(clean))
    })
}

/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

pub fn to_inbound_message(msg: &Message, content: MessageContent) -> InboundMessage {
    InboundMessage {
        id: msg.id.0.to_string(),
        chat_id: msg.chat.id.0,
        content,
        timestamp: msg.date.to_rfc3339(),
    }
}
