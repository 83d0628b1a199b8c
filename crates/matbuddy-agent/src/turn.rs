// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One incoming message in, exactly one reply out.
//!
//! ```text
//! RECEIVED -> REJECTED_OFF_TOPIC
//!          -> REJECTED_BUDGET
//!          -> PROCESSING -> REPLIED | FAILED
//! ```
//!
//! Quota is checked before the model is called and counted only after a
//! reply exists. History is appended only on `REPLIED`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use matbuddy_config::MatbuddyConfig;
use matbuddy_core::types::{ChatRequest, HistoryEntry, MessageContent, Part};
use matbuddy_core::{
    ChannelAdapter, ChatHandle, Clock, MatbuddyError, ProviderAdapter, StorageAdapter,
};
use matbuddy_guard::{replace_model_links, GuardFilter};
use matbuddy_quota::QuotaMeter;
use matbuddy_resilience::{Decision, Exhausted, FallbackPlan, RetryPolicy};
use matbuddy_skill::builtin::notes::MAX_NOTE_WORDS;
use matbuddy_skill::{ToolCall, ToolName, ToolRegistry};

use crate::confirm::{self, VOICE_PLACEHOLDER};
use crate::context;
use crate::session::SessionStore;
use crate::tool_loop::{self, LoopLimits, LoopOutcome};

pub const OFF_TOPIC_REPLY: &str = "i can only help with BJJ and training related topics. try /help!";
pub const GLOBAL_BUDGET_REPLY: &str =
    "the ai assistant is temporarily overloaded. you can still use all the commands from the menu!";
pub const EMPTY_MODEL_REPLY: &str =
    "i can help with your BJJ training. try asking about your notes, goals, or schedule!";
pub const RATE_LIMITED_REPLY: &str =
    "the ai assistant is busy right now. wait a minute and try again, or use the commands from the menu!";
pub const FAILURE_REPLY: &str =
    "something went wrong with the ai assistant. try again, or use /help for all bot features!";
/// Text part sent alongside voice bytes.
pub const VOICE_PROMPT: &str = "(the user sent a voice message, respond to what they said)";

pub fn daily_quota_reply(limit: u32) -> String {
    format!(
        "you've used all {limit} ai messages for today.\nthey reset at midnight. use /help for all bot features!"
    )
}

/// Where a turn is, or how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    RejectedOffTopic,
    RejectedBudget,
    Processing,
    Replied,
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Received => write!(f, "received"),
            TurnState::RejectedOffTopic => write!(f, "rejected_off_topic"),
            TurnState::RejectedBudget => write!(f, "rejected_budget"),
            TurnState::Processing => write!(f, "processing"),
            TurnState::Replied => write!(f, "replied"),
            TurnState::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal state plus the single message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub reply: String,
}

impl TurnOutcome {
    fn new(state: TurnState, reply: impl Into<String>) -> Self {
        Self {
            state,
            reply: reply.into(),
        }
    }
}

/// Composes guard, quota, sessions, fallback, and the tool loop.
pub struct TurnOrchestrator {
    guard: GuardFilter,
    quota: QuotaMeter,
    sessions: SessionStore,
    registry: ToolRegistry,
    provider: Arc<dyn ProviderAdapter>,
    storage: Arc<dyn StorageAdapter>,
    models: Vec<String>,
    policy: RetryPolicy,
    limits: LoopLimits,
    base_instruction: String,
    history_entries: usize,
    footer_threshold: u32,
}

impl TurnOrchestrator {
    pub fn new(
        config: &MatbuddyConfig,
        provider: Arc<dyn ProviderAdapter>,
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        base_instruction: String,
    ) -> Self {
        Self {
            guard: GuardFilter::new(&config.guard),
            quota: QuotaMeter::new(&config.quota, storage.clone(), clock.clone()),
            sessions: SessionStore::new(&config.session, clock.clone()),
            registry: ToolRegistry::new(storage.clone(), clock),
            provider,
            storage,
            models: config.gemini.models.clone(),
            policy: RetryPolicy::from_config(&config.retry),
            limits: LoopLimits {
                max_rounds: config.tools.max_rounds,
                max_urls: config.tools.max_collected_urls,
            },
            base_instruction,
            history_entries: config.history.max_entries(),
            footer_threshold: config.quota.footer_threshold,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Runs one turn. Never fails: every problem ends in a terminal state
    /// with a message for the user.
    pub async fn handle(&self, chat_id: i64, content: &MessageContent) -> TurnOutcome {
        self.handle_on(None, chat_id, content).await
    }

    /// Like [`handle`](Self::handle), showing a typing indicator on `channel`
    /// once the turn has passed its budget checks.
    pub async fn handle_on(
        &self,
        channel: Option<&dyn ChannelAdapter>,
        chat_id: i64,
        content: &MessageContent,
    ) -> TurnOutcome {
        let text = match content {
            MessageContent::Text(t) => Some(t.trim()),
            MessageContent::Voice { .. } => None,
        };
        debug!(chat_id, voice = text.is_none(), state = %TurnState::Received, "turn started");

        let outcome = if text.is_some_and(|t| self.guard.is_off_topic(t)) {
            TurnOutcome::new(TurnState::RejectedOffTopic, OFF_TOPIC_REPLY)
        } else {
            match self.process(channel, chat_id, content, text).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(chat_id, error = %e, "turn failed");
                    self.sessions.invalidate(chat_id);
                    TurnOutcome::new(TurnState::Failed, FAILURE_REPLY)
                }
            }
        };

        info!(chat_id, state = %outcome.state, "turn finished");
        outcome
    }

    async fn process(
        &self,
        channel: Option<&dyn ChannelAdapter>,
        chat_id: i64,
        content: &MessageContent,
        text: Option<&str>,
    ) -> Result<TurnOutcome, MatbuddyError> {
        if self.quota.global_exceeded().await? {
            warn!(chat_id, "monthly AI budget exhausted");
            return Ok(TurnOutcome::new(TurnState::RejectedBudget, GLOBAL_BUDGET_REPLY));
        }

        let record = self.storage.load(chat_id).await?;
        if self.quota.remaining(&record) == 0 {
            info!(chat_id, limit = self.quota.daily_limit(), "daily AI quota exhausted");
            return Ok(TurnOutcome::new(
                TurnState::RejectedBudget,
                daily_quota_reply(self.quota.daily_limit()),
            ));
        }

        if let Some(channel) = channel
            && let Err(e) = channel.send_typing(chat_id).await
        {
            debug!(chat_id, error = %e, "failed to send typing indicator");
        }

        let pending = confirm::detect_pending_offer(&record.ai_history);
        if let (Some(text), Some(candidate)) = (text, pending.as_deref())
            && confirm::is_affirmative(text)
        {
            return self.save_confirmed(chat_id, text, candidate).await;
        }

        debug!(chat_id, state = %TurnState::Processing, pending_offer = pending.is_some(), "calling model");
        let user_context = match self.registry.prefetch_context(chat_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(chat_id, error = %e, "could not prefetch user data");
                String::new()
            }
        };
        let instruction = context::system_instruction(&self.base_instruction, &user_context);
        let parts = input_parts(content, pending.as_deref());

        let (handle, model, outcome) =
            match self.call_models(chat_id, &instruction, &record.ai_history, parts).await {
                Ok(done) => done,
                Err(exhausted) => {
                    error!(
                        chat_id,
                        aborted = exhausted.aborted,
                        last_error = exhausted.last_error.as_deref().unwrap_or(""),
                        "all model candidates failed"
                    );
                    let reply = if exhausted.rate_limited() {
                        RATE_LIMITED_REPLY
                    } else {
                        FAILURE_REPLY
                    };
                    return Ok(TurnOutcome::new(TurnState::Failed, reply));
                }
            };

        let mut reply = outcome.response.text();
        if reply.trim().is_empty() {
            reply = EMPTY_MODEL_REPLY.to_string();
        }
        let reply = replace_model_links(&self.guard.sanitize(&reply), &outcome.urls);

        if text.is_none()
            && let Some(candidate) = pending.as_deref()
        {
            self.voice_fallback_save(chat_id, candidate, &outcome, &reply).await;
        }

        self.sessions.put(chat_id, handle, &model);

        let user_entry = HistoryEntry::user(text.unwrap_or(VOICE_PLACEHOLDER));
        let model_entry = HistoryEntry::model(reply.clone());
        let max_entries = self.history_entries;
        let count = self
            .quota
            .increment(chat_id, move |record| {
                record.push_history(user_entry, model_entry, max_entries)
            })
            .await?;
        if let Err(e) = self.quota.global_increment().await {
            warn!(chat_id, error = %e, "failed to record global usage");
        }

        let remaining = self.quota.daily_limit().saturating_sub(count);
        let mut reply = reply;
        if remaining <= self.footer_threshold {
            reply.push_str(&format!("\n\n({remaining} ai messages left today)"));
        }
        info!(chat_id, %model, rounds = outcome.rounds, urls = outcome.urls.len(), remaining, "model replied");
        Ok(TurnOutcome::new(TurnState::Replied, reply))
    }

    /// Walks the candidate list until one model produces a response.
    async fn call_models(
        &self,
        chat_id: i64,
        instruction: &str,
        history: &[HistoryEntry],
        parts: Vec<Part>,
    ) -> Result<(Box<dyn ChatHandle>, String, LoopOutcome), Exhausted> {
        let mut cached = self.sessions.take(chat_id);
        let mut plan = FallbackPlan::new(self.models.clone(), self.policy);

        while let Some(attempt) = plan.next_attempt().await {
            let reusable = cached.take_if(|s| attempt.allow_cached && s.model == attempt.candidate);
            let (mut handle, used_cached) = match reusable {
                Some(session) => (session.handle, true),
                None => {
                    let request = ChatRequest {
                        model: attempt.candidate.clone(),
                        system_instruction: instruction.to_string(),
                        tools: self.registry.action_descriptors(),
                        history: history.to_vec(),
                    };
                    match self.provider.start_chat(request).await {
                        Ok(handle) => (handle, false),
                        Err(e) => {
                            if plan.on_failure(&e.to_string(), false) == Decision::Abort {
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            debug!(
                chat_id,
                model = %attempt.candidate,
                candidate = attempt.candidate_index,
                attempt = attempt.number,
                cached = used_cached,
                "sending turn"
            );
            match handle.send(parts.clone()).await {
                Ok(response) => {
                    let outcome =
                        tool_loop::run(handle.as_mut(), response, &self.registry, chat_id, self.limits)
                            .await;
                    return Ok((handle, attempt.candidate, outcome));
                }
                Err(e) => {
                    if plan.on_failure(&e.to_string(), used_cached) == Decision::Abort {
                        break;
                    }
                }
            }
        }

        Err(plan.exhausted())
    }

    /// Saves the offered note without a model call. Consumes no quota.
    async fn save_confirmed(
        &self,
        chat_id: i64,
        text: &str,
        candidate: &str,
    ) -> Result<TurnOutcome, MatbuddyError> {
        let note = confirm::truncate_words(candidate, MAX_NOTE_WORDS);
        let result = self
            .registry
            .run(chat_id, &ToolCall::SaveTrainingNote { note_text: note.clone() })
            .await;
        if result.starts_with("ERROR") {
            warn!(chat_id, %result, "confirmed note was not saved");
            return Ok(TurnOutcome::new(TurnState::Failed, FAILURE_REPLY));
        }

        let reply = format!("saved to your notes: \"{note}\"\ncheck them anytime with /notes");
        let mut record = self.storage.load(chat_id).await?;
        record.push_history(
            HistoryEntry::user(text),
            HistoryEntry::model(reply.clone()),
            self.history_entries,
        );
        self.storage.save(chat_id, &record).await?;
        // The cached conversation never saw this exchange.
        self.sessions.invalidate(chat_id);

        info!(chat_id, "pending note saved on confirmation");
        Ok(TurnOutcome::new(TurnState::Replied, reply))
    }

    /// Saves the offered note after a voice turn whose reply claims a save
    /// the model never performed.
    async fn voice_fallback_save(
        &self,
        chat_id: i64,
        candidate: &str,
        outcome: &LoopOutcome,
        reply: &str,
    ) {
        if outcome.invoked(&ToolName::SaveTrainingNote.to_string()) || !confirm::acknowledges_save(reply) {
            return;
        }
        let note_text = confirm::truncate_words(candidate, MAX_NOTE_WORDS);
        let result = self
            .registry
            .run(chat_id, &ToolCall::SaveTrainingNote { note_text })
            .await;
        if result.starts_with("ERROR") {
            warn!(chat_id, %result, "voice fallback save failed");
        } else {
            info!(chat_id, "voice fallback save performed");
        }
    }
}

/// Model input for the current message.
fn input_parts(content: &MessageContent, pending: Option<&str>) -> Vec<Part> {
    match content {
        MessageContent::Text(text) => vec![Part::Text(text.trim().to_string())],
        MessageContent::Voice { data, mime_type } => {
            let mut parts = vec![
                Part::InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                },
                Part::Text(VOICE_PROMPT.to_string()),
            ];
            if let Some(candidate) = pending {
                parts.push(Part::Text(confirm::voice_offer_hint(candidate)));
            }
            parts
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_input_is_a_single_trimmed_part() {
        let parts = input_parts(&MessageContent::Text("  what's a kimura ".into()), Some("x"));
        assert_eq!(parts, [Part::Text("what's a kimura".into())]);
    }

    #[test]
    fn voice_input_carries_bytes_prompt_and_offer_hint() {
        let voice = MessageContent::Voice {
            data: vec![1, 2, 3],
            mime_type: "audio/ogg".into(),
        };
        let parts = input_parts(&voice, None);
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Part::InlineData { mime_type, .. } if mime_type == "audio/ogg"));
        assert_eq!(parts[1], Part::Text(VOICE_PROMPT.into()));

        let parts = input_parts(&voice, Some("drilled kimura"));
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[2], Part::Text(t) if t.contains("\"drilled kimura\"")));
    }

    #[test]
    fn daily_quota_reply_names_the_limit() {
        assert_eq!(
            daily_quota_reply(100),
            "you've used all 100 ai messages for today.\nthey reset at midnight. use /help for all bot features!"
        );
    }

    #[test]
    fn states_display_in_snake_case() {
        assert_eq!(TurnState::RejectedOffTopic.to_string(), "rejected_off_topic");
        assert_eq!(TurnState::Replied.to_string(), "replied");
    }
}
