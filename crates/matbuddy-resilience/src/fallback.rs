// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered model fallback with per-candidate retry.
//!
//! The caller drives the plan:
//!
//! ```ignore
//! let mut plan = FallbackPlan::new(models, policy);
//! while let Some(attempt) = plan.next_attempt().await {
//!     match call(&attempt).await {
//!         Ok(reply) => return Ok(reply),
//!         Err(e) => { plan.on_failure(&e.to_string(), used_cached); }
//!     }
//! }
//! let exhausted = plan.exhausted();
//! ```

use std::time::Duration;

use tracing::{debug, warn};

use matbuddy_config::model::RetryConfig;

use crate::classify::{classify, ErrorClass};

/// Attempt count and capped exponential backoff for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay before retry number `retry` (1 = the second attempt).
    pub fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(20);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// One model call the caller should make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub candidate: String,
    /// Position of the candidate in priority order.
    pub candidate_index: usize,
    /// 1-based attempt number against this candidate.
    pub number: u32,
    /// Whether a cached conversation for this candidate may be reused.
    /// False once anything in the turn has failed.
    pub allow_cached: bool,
}

/// What the plan does after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The cached conversation went bad; retry immediately on a fresh one.
    /// Does not use up an attempt.
    RetryFresh,
    /// Retry the same candidate after `delay`.
    RetrySame { delay: Duration },
    /// Give up on this candidate and try the next one without delay.
    NextCandidate,
    /// Stop the whole turn.
    Abort,
}

/// Why a plan ran out of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted {
    pub last_class: Option<ErrorClass>,
    pub last_error: Option<String>,
    /// True when an unclassified error ended the turn early.
    pub aborted: bool,
}

impl Exhausted {
    /// The final failure was a rate-limit signal.
    pub fn rate_limited(&self) -> bool {
        self.last_class == Some(ErrorClass::Retryable)
    }
}

/// Per-turn state machine over the candidate list.
#[derive(Debug)]
pub struct FallbackPlan {
    candidates: Vec<String>,
    policy: RetryPolicy,
    index: usize,
    attempts_on_candidate: u32,
    pending_delay: Option<Duration>,
    fresh_retry_used: bool,
    failed_once: bool,
    aborted: bool,
    last: Option<(ErrorClass, String)>,
}

impl FallbackPlan {
    pub fn new(candidates: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            candidates,
            policy,
            index: 0,
            attempts_on_candidate: 0,
            pending_delay: None,
            fresh_retry_used: false,
            failed_once: false,
            aborted: false,
            last: None,
        }
    }

    /// Returns the next call to make, sleeping first if a backoff is due.
    pub async fn next_attempt(&mut self) -> Option<Attempt> {
        if self.aborted {
            return None;
        }
        let candidate = self.candidates.get(self.index)?.clone();
        if let Some(delay) = self.pending_delay.take() {
            debug!(model = %candidate, delay_ms = delay.as_millis() as u64, "backing off before retry");
            tokio::time::sleep(delay).await;
        }
        self.attempts_on_candidate += 1;
        Some(Attempt {
            candidate,
            candidate_index: self.index,
            number: self.attempts_on_candidate,
            allow_cached: !self.failed_once,
        })
    }

    /// Records a failed call and decides what happens next.
    ///
    /// `used_cached` says whether the failed call went through a conversation
    /// reused from an earlier turn.
    pub fn on_failure(&mut self, description: &str, used_cached: bool) -> Decision {
        let class = classify(description);
        let model = self.candidates.get(self.index).cloned().unwrap_or_default();
        self.failed_once = true;
        self.last = Some((class, description.to_string()));

        let decision = if used_cached && !self.fresh_retry_used {
            self.fresh_retry_used = true;
            self.attempts_on_candidate = self.attempts_on_candidate.saturating_sub(1);
            Decision::RetryFresh
        } else {
            match class {
                ErrorClass::Retryable if self.attempts_on_candidate < self.policy.max_attempts => {
                    let delay = self.policy.backoff(self.attempts_on_candidate);
                    self.pending_delay = Some(delay);
                    Decision::RetrySame { delay }
                }
                ErrorClass::Retryable | ErrorClass::Permanent => {
                    self.index += 1;
                    self.attempts_on_candidate = 0;
                    self.pending_delay = None;
                    Decision::NextCandidate
                }
                ErrorClass::Unknown => {
                    self.aborted = true;
                    Decision::Abort
                }
            }
        };

        warn!(
            %model,
            attempt = self.attempts_on_candidate,
            %class,
            ?decision,
            error = description,
            "model attempt failed"
        );
        decision
    }

    /// Summary of the last failure, for choosing the apology.
    pub fn exhausted(&self) -> Exhausted {
        Exhausted {
            last_class: self.last.as_ref().map(|(class, _)| *class),
            last_error: self.last.as_ref().map(|(_, msg)| msg.clone()),
            aborted: self.aborted,
        }
    }
}
