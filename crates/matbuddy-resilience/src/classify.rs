// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Substring classification of provider errors.

use strum::Display;

/// How the fallback controller should treat a failed model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    /// Rate limit or quota signal: wait and try the same model again.
    Retryable,
    /// Model missing or unsupported: move to the next model at once.
    Permanent,
    /// Anything else: give up on the turn.
    Unknown,
}

const RETRYABLE_SIGNALS: &[&str] = &[
    "429",
    "quota",
    "rate limit",
    "rate-limit",
    "ratelimit",
    "resource_exhausted",
    "resource exhausted",
    "too many requests",
    "overloaded",
];

const PERMANENT_SIGNALS: &[&str] = &[
    "404",
    "not found",
    "not_found",
    "no longer available",
    "not supported",
    "unsupported",
    "deprecated",
];

/// Classifies an error by its description alone.
///
/// Rate-limit signals win when a message carries both kinds.
pub fn classify(description: &str) -> ErrorClass {
    let lower = description.to_lowercase();
    if RETRYABLE_SIGNALS.iter().any(|s| lower.contains(s)) {
        ErrorClass::Retryable
    } else if PERMANENT_SIGNALS.iter().any(|s| lower.contains(s)) {
        ErrorClass::Permanent
    } else {
        ErrorClass::Unknown
    }
}
