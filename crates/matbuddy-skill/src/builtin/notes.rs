// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `get_training_notes` and `save_training_note`.

use chrono::{DateTime, Local};

use matbuddy_core::record::{Note, UserRecord};
use matbuddy_core::{MatbuddyError, StorageAdapter};

use crate::catalog::find_techniques_in_text;

/// Longest note, in words, the assistant may save.
pub const MAX_NOTE_WORDS: usize = 20;

pub fn recent(record: &UserRecord, count: usize) -> String {
    if record.notes.is_empty() {
        return "User has no training notes yet.\nCOMMAND: /note to log your first note".to_string();
    }
    let start = record.notes.len().saturating_sub(count);
    let mut lines: Vec<String> = record.notes[start..]
        .iter()
        .map(|n| format!("{} {}: {}", n.date, n.time, n.text))
        .collect();
    lines.push("\nCOMMAND: /notes to view all notes, /note to add a new one".to_string());
    lines.join("\n")
}

/// Validates and appends a note. Validation failures are returned as
/// `ERROR:` text; only storage failures are errors.
pub async fn save(
    storage: &dyn StorageAdapter,
    user_id: i64,
    note_text: &str,
    now: DateTime<Local>,
) -> Result<String, MatbuddyError> {
    let text = note_text.trim();
    let words = text.split_whitespace().count();
    if words == 0 {
        return Ok("ERROR: empty note, nothing saved.".to_string());
    }
    if words > MAX_NOTE_WORDS {
        return Ok(format!(
            "ERROR: note is {words} words, max {MAX_NOTE_WORDS}. Ask the user to shorten it."
        ));
    }

    let techniques = find_techniques_in_text(text);
    let mut record = storage.load(user_id).await?;
    record.notes.push(Note {
        date: now.format("%Y-%m-%d").to_string(),
        time: now.format("%H:%M").to_string(),
        day: now.format("%A").to_string(),
        text: text.to_string(),
        techniques: techniques.clone(),
        created_at: now.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
        ..Default::default()
    });
    storage.save(user_id, &record).await?;
    tracing::info!(user_id, words, "training note saved");

    let mut result = format!("Note saved: \"{text}\"");
    if !techniques.is_empty() {
        result.push_str(&format!(" (detected techniques: {})", techniques.join(", ")));
    }
    result.push_str("\nCOMMAND: /notes to view all notes, /goal to set a goal based on this");
    Ok(result)
}
