// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool names, descriptors, and the registry that dispatches calls.
//!
//! The [`ToolRegistry`] owns the immutable descriptor list built at startup
//! and routes each [`ToolCall`] to its executor in [`crate::builtin`].

use std::sync::Arc;

use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

use matbuddy_core::types::{ParamType, ToolDescriptor, ToolKind, ToolParam};
use matbuddy_core::{Clock, MatbuddyError, StorageAdapter};

use crate::builtin;
use crate::call::ToolCall;

/// Every tool the assistant knows, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    GetTrainingNotes,
    GetGoals,
    GetSchedule,
    GetFocusAndToolbox,
    GetTrainingStats,
    SearchTechnique,
    ListTechniques,
    SaveTrainingNote,
}

impl ToolName {
    /// Action tools are callable by the model; read tools are pre-fetched.
    pub fn kind(self) -> ToolKind {
        match self {
            ToolName::SearchTechnique | ToolName::ListTechniques | ToolName::SaveTrainingNote => {
                ToolKind::Action
            }
            _ => ToolKind::Read,
        }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        let (description, params): (&str, Vec<ToolParam>) = match self {
            ToolName::GetTrainingNotes => (
                "Retrieve the user's recent training notes. Call this when the user asks about \
                 their notes, training history, what they practiced, or what they learned.",
                vec![param(
                    "count",
                    ParamType::Integer,
                    "How many recent notes to return. Default 5, max 15.",
                    false,
                )],
            ),
            ToolName::GetGoals => (
                "Retrieve the user's active and recently completed goals. Call this when the \
                 user asks about their goals, progress, or what to work on.",
                vec![],
            ),
            ToolName::GetSchedule => (
                "Retrieve the user's training schedule (days and times). Call this when the \
                 user asks about their schedule or upcoming training.",
                vec![],
            ),
            ToolName::GetFocusAndToolbox => (
                "Retrieve the user's current focus technique and their toolbox of known \
                 techniques. Call this when the user asks about what technique they are \
                 drilling, what they already know, or their toolbox.",
                vec![],
            ),
            ToolName::GetTrainingStats => (
                "Retrieve the user's training statistics: sessions this week, streak, total \
                 notes, total goals completed. Call this when the user asks about their stats, \
                 progress, or activity.",
                vec![],
            ),
            ToolName::SearchTechnique => (
                "Search the technique database for a BJJ technique by name. Call this whenever \
                 the user mentions a technique, submission, sweep, escape, pass, takedown, or \
                 position. Returns the technique details and video link. ALWAYS call this when \
                 a technique name appears in the conversation.",
                vec![param(
                    "query",
                    ParamType::String,
                    "The technique name to search for, e.g. 'kimura', 'armbar', 'scissor sweep'.",
                    true,
                )],
            ),
            ToolName::ListTechniques => (
                "List available BJJ techniques. If a category is given (escapes, submissions, \
                 sweeps, guardpasses, takedowns, positions, ukemi, selfdefense), list all \
                 techniques in that category. If no category is given, list all category \
                 names. ALWAYS call this when the user asks what techniques are available, \
                 what they can practice, or asks to see a list of techniques.",
                vec![param(
                    "category",
                    ParamType::String,
                    "Category to list. One of: escapes, submissions, sweeps, guardpasses, \
                     takedowns, positions, ukemi, selfdefense. Leave empty to list all categories.",
                    false,
                )],
            ),
            ToolName::SaveTrainingNote => (
                "Save a training note for the user. Call this ONLY after the user has confirmed \
                 they want to save. When the user describes what they practiced, trained, or \
                 learned, first ask if they want to save it as a note. If they say yes, call \
                 this tool with the note text. The note must be between 1 and 20 words.",
                vec![param(
                    "note_text",
                    ParamType::String,
                    "The training note text to save (1 to 20 words).",
                    true,
                )],
            ),
        };
        ToolDescriptor {
            name: self.to_string(),
            description: description.to_string(),
            kind: self.kind(),
            params,
        }
    }
}

fn param(name: &str, param_type: ParamType, description: &str, required: bool) -> ToolParam {
    ToolParam {
        name: name.to_string(),
        param_type,
        description: description.to_string(),
        required,
    }
}

/// Registry of the closed tool set, bound to one storage backend.
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
}

impl ToolRegistry {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            descriptors: ToolName::iter().map(ToolName::descriptor).collect(),
            storage,
            clock,
        }
    }

    /// All descriptors in presentation order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// The descriptors exposed to the model as callable functions.
    pub fn action_descriptors(&self) -> Vec<ToolDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.kind == ToolKind::Action)
            .cloned()
            .collect()
    }

    /// Parses and runs a model function call. Never fails: parse errors and
    /// executor errors come back as result text.
    pub async fn execute(&self, user_id: i64, name: &str, args: &Value) -> String {
        match ToolCall::parse(name, args) {
            Ok(call) => self.run(user_id, &call).await,
            Err(e) => {
                warn!(user_id, tool = name, error = %e, "rejected tool call");
                e.to_string()
            }
        }
    }

    /// Runs a typed call. Never fails.
    pub async fn run(&self, user_id: i64, call: &ToolCall) -> String {
        debug!(user_id, tool = %call.name(), "executing tool");
        match self.try_run(user_id, call).await {
            Ok(text) => text,
            Err(e) => {
                warn!(user_id, tool = %call.name(), error = %e, "tool execution failed");
                format!("ERROR: {} failed, please try again later.", call.name())
            }
        }
    }

    async fn try_run(&self, user_id: i64, call: &ToolCall) -> Result<String, MatbuddyError> {
        let now = self.clock.now();
        Ok(match call {
            ToolCall::SearchTechnique { query } => builtin::techniques::search(query),
            ToolCall::ListTechniques { category } => {
                builtin::techniques::list(category.as_deref())
            }
            ToolCall::SaveTrainingNote { note_text } => {
                builtin::notes::save(self.storage.as_ref(), user_id, note_text, now).await?
            }
            read => {
                let record = self.storage.load(user_id).await?;
                builtin::overview::read(read, &record, now)
            }
        })
    }

    /// Output of every read tool with default arguments, for the system
    /// context. Loads the record once.
    pub async fn prefetch_context(&self, user_id: i64) -> Result<String, MatbuddyError> {
        let record = self.storage.load(user_id).await?;
        let now = self.clock.now();
        let sections: Vec<String> = ToolName::iter()
            .filter(|t| t.kind() == ToolKind::Read)
            .filter_map(|t| ToolCall::parse(&t.to_string(), &Value::Null).ok())
            .map(|call| format!("[{}]\n{}", call.name(), builtin::overview::read(&call, &record, now)))
            .collect();
        Ok(sections.join("\n\n"))
    }
}
