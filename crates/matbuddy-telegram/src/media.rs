// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice note download.

use matbuddy_core::error::MatbuddyError;
use matbuddy_core::types::MessageContent;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, Voice};
use tracing::debug;

/// Telegram voice notes are OGG/Opus unless stated otherwise.
pub const DEFAULT_VOICE_MIME: &str = "audio/ogg";

/// Downloads a file from Telegram servers by its file metadata.
///
/// Uses the Bot API's `getFile` to resolve the file path, then downloads
/// the file content as bytes.
pub async fn download_file(bot: &Bot, file_meta: &FileMeta) -> Result<Vec<u8>, MatbuddyError> {
    let file = bot
        .get_file(file_meta.id.clone())
        .await
        .map_err(|e| MatbuddyError::Channel {
            message: format!("failed to get file info: {e}"),
            source: Some(Box::new(e)),
        })?;

    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| MatbuddyError::Channel {
            message: format!("failed to download file: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(file_id = %file_meta.id, size = buf.len(), "downloaded file from Telegram");
    Ok(buf)
}

/// Downloads a voice note into [`MessageContent::Voice`].
pub async fn extract_voice_content(bot: &Bot, voice: &Voice) -> Result<MessageContent, MatbuddyError> {
    let data = download_file(bot, &voice.file).await?;
    Ok(MessageContent::Voice {
        data,
        mime_type: voice_mime(voice),
    })
}

pub fn voice_mime(voice: &Voice) -> String {
    voice
        .mime_type
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| DEFAULT_VOICE_MIME.to_string())
}
