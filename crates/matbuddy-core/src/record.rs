// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit schema for the per-user JSON record.
//!
//! The command surface of the bot writes the same file, so every struct keeps
//! unrecognised keys in a flattened `extra` map and writes them back untouched.
//! Records written by older versions are upgraded by [`UserRecord::from_value`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::HistoryEntry;

/// Current schema version written on save.
pub const RECORD_VERSION: u32 = 1;

/// Top-level fields that older records may carry as `null`.
const NULLABLE_DEFAULTED: &[&str] = &[
    "goals",
    "notes",
    "drill_queue",
    "training_log",
    "toolbox",
    "schedule",
    "reminder_times",
    "ai_usage",
    "ai_history",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub version: u32,
    pub goals: Vec<Goal>,
    pub notes: Vec<Note>,
    pub drill_queue: Vec<Value>,
    pub active_drill: Option<ActiveDrill>,
    pub training_log: Vec<TrainingLogEntry>,
    pub toolbox: Vec<ToolboxEntry>,
    pub schedule: Vec<ScheduleEntry>,
    pub reminder_times: ReminderTimes,
    pub ai_usage: AiUsage,
    pub ai_history: Vec<HistoryEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            goals: Vec::new(),
            notes: Vec::new(),
            drill_queue: Vec::new(),
            active_drill: None,
            training_log: Vec::new(),
            toolbox: Vec::new(),
            schedule: Vec::new(),
            reminder_times: ReminderTimes::default(),
            ai_usage: AiUsage::default(),
            ai_history: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl UserRecord {
    /// Parses a stored record, filling defaults and upgrading older layouts.
    pub fn from_value(mut value: Value) -> Result<Self, serde_json::Error> {
        if let Value::Object(map) = &mut value {
            for key in NULLABLE_DEFAULTED {
                if map.get(*key).is_some_and(Value::is_null) {
                    map.remove(*key);
                }
            }
            // Records from before versioning have no version key at all.
            map.entry("version").or_insert(Value::from(0));
        }
        let mut record: UserRecord = serde_json::from_value(value)?;
        record.migrate();
        Ok(record)
    }

    fn migrate(&mut self) {
        if self.version < RECORD_VERSION {
            tracing::debug!(from = self.version, to = RECORD_VERSION, "migrating user record");
        }
        self.ai_history.retain(|entry| !entry.text.is_empty());
        self.version = RECORD_VERSION;
    }

    /// Appends one user/model exchange and keeps only the newest `max_entries`.
    pub fn push_history(&mut self, user: HistoryEntry, model: HistoryEntry, max_entries: usize) {
        self.ai_history.push(user);
        self.ai_history.push(model);
        if self.ai_history.len() > max_entries {
            let excess = self.ai_history.len() - max_entries;
            self.ai_history.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goal {
    #[serde(rename = "goals")]
    pub text: String,
    /// `active`, `completed`, or whatever the command surface stored.
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Goal {
    /// Goals without a status predate status tracking and count as active.
    pub fn is_active(&self) -> bool {
        self.status.is_empty() || self.status == "active"
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub date: String,
    pub time: String,
    pub day: String,
    pub text: String,
    pub techniques: Vec<String>,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveDrill {
    pub technique: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingLogEntry {
    pub date: String,
    pub trained: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxEntry {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEntry {
    pub day: String,
    pub time: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderTimes {
    pub daily_checkin: String,
    pub focus_reminder: String,
    pub goal_reminder: String,
    pub refresh_reminder: String,
}

impl Default for ReminderTimes {
    fn default() -> Self {
        Self {
            daily_checkin: "20:00".into(),
            focus_reminder: "09:00".into(),
            goal_reminder: "08:00".into(),
            refresh_reminder: "10:00".into(),
        }
    }
}

/// Per-user daily AI usage counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiUsage {
    /// Day the count belongs to, `YYYY-MM-DD`. Empty for a fresh record.
    pub date: String,
    pub count: u32,
}

/// Process-wide monthly AI usage counter, stored in its own file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalUsage {
    /// `YYYY-MM`.
    pub month: String,
    pub count: u64,
}
