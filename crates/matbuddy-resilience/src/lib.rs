// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for model calls.
//!
//! - [`classify`] maps an opaque provider error description to an
//!   [`ErrorClass`].
//! - [`RetryPolicy`] computes capped exponential backoff.
//! - [`FallbackPlan`] walks an ordered list of model candidates, retrying
//!   rate-limited ones and skipping unavailable ones.

pub mod classify;
pub mod fallback;

pub use classify::{classify, ErrorClass};
pub use fallback::{Attempt, Decision, Exhausted, FallbackPlan, RetryPolicy};
