// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed tool calls parsed from model function-call requests.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::tool::ToolName;

/// Default and ceiling for `get_training_notes.count`.
pub const DEFAULT_NOTE_COUNT: usize = 5;
pub const MAX_NOTE_COUNT: usize = 15;

/// A request to run one tool, with its arguments already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    GetTrainingNotes { count: usize },
    GetGoals,
    GetSchedule,
    GetFocusAndToolbox,
    GetTrainingStats,
    SearchTechnique { query: String },
    ListTechniques { category: Option<String> },
    SaveTrainingNote { note_text: String },
}

/// Why a model request could not become a [`ToolCall`].
///
/// The display text is fed back to the model as the call's result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolCallError {
    #[error("Tool not available: {0}")]
    Unknown(String),

    #[error("ERROR: invalid arguments for {tool}: {detail}")]
    InvalidArguments { tool: ToolName, detail: String },
}

#[derive(Deserialize)]
struct QueryArgs {
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
struct CategoryArgs {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Deserialize)]
struct NoteArgs {
    #[serde(default)]
    note_text: String,
}

impl ToolCall {
    /// Parses a function-call request. Missing optional arguments take their
    /// defaults; arguments of the wrong type are rejected.
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolCallError> {
        let tool = ToolName::from_str(name).map_err(|_| ToolCallError::Unknown(name.to_string()))?;
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args.clone()
        };
        let invalid = |e: serde_json::Error| ToolCallError::InvalidArguments {
            tool,
            detail: e.to_string(),
        };

        Ok(match tool {
            ToolName::GetTrainingNotes => ToolCall::GetTrainingNotes {
                count: note_count(args.get("count")).map_err(|detail| {
                    ToolCallError::InvalidArguments { tool, detail }
                })?,
            },
            ToolName::GetGoals => ToolCall::GetGoals,
            ToolName::GetSchedule => ToolCall::GetSchedule,
            ToolName::GetFocusAndToolbox => ToolCall::GetFocusAndToolbox,
            ToolName::GetTrainingStats => ToolCall::GetTrainingStats,
            ToolName::SearchTechnique => {
                let QueryArgs { query } = serde_json::from_value(args).map_err(invalid)?;
                ToolCall::SearchTechnique { query }
            }
            ToolName::ListTechniques => {
                let CategoryArgs { category } = serde_json::from_value(args).map_err(invalid)?;
                ToolCall::ListTechniques {
                    category: category.filter(|c| !c.trim().is_empty()),
                }
            }
            ToolName::SaveTrainingNote => {
                let NoteArgs { note_text } = serde_json::from_value(args).map_err(invalid)?;
                ToolCall::SaveTrainingNote { note_text }
            }
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::GetTrainingNotes { .. } => ToolName::GetTrainingNotes,
            ToolCall::GetGoals => ToolName::GetGoals,
            ToolCall::GetSchedule => ToolName::GetSchedule,
            ToolCall::GetFocusAndToolbox => ToolName::GetFocusAndToolbox,
            ToolCall::GetTrainingStats => ToolName::GetTrainingStats,
            ToolCall::SearchTechnique { .. } => ToolName::SearchTechnique,
            ToolCall::ListTechniques { .. } => ToolName::ListTechniques,
            ToolCall::SaveTrainingNote { .. } => ToolName::SaveTrainingNote,
        }
    }
}

/// Models send integers as JSON numbers (sometimes `5.0`) or strings.
fn note_count(raw: Option<&Value>) -> Result<usize, String> {
    let count = match raw {
        None | Some(Value::Null) => DEFAULT_NOTE_COUNT,
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => v as usize,
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as usize)
                .ok_or_else(|| format!("count must be a non-negative integer, got {n}"))?,
        },
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| format!("count must be an integer, got {s:?}"))?,
        Some(other) => return Err(format!("count must be an integer, got {other}")),
    };
    Ok(count.min(MAX_NOTE_COUNT))
}
