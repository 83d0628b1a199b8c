// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded model/tool exchange for one model attempt.
//!
//! Each round executes the function calls the model asked for (minus any
//! already executed this turn), harvests verified video links from the
//! results, and sends all results back in one message. The loop never fails:
//! a failed follow-up ends it with what was gathered so far.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde_json::Value;
use tracing::{debug, warn};

use matbuddy_core::types::{FunctionCall, FunctionResult, ModelResponse};
use matbuddy_core::ChatHandle;
use matbuddy_skill::{ToolRegistry, VIDEO_URL_MARKER};

/// Round and link caps.
#[derive(Debug, Clone, Copy)]
pub struct LoopLimits {
    pub max_rounds: u32,
    pub max_urls: usize,
}

/// What the loop ended with.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// The last response obtained from the model.
    pub response: ModelResponse,
    /// Links from tool results, in first-seen order.
    pub urls: Vec<String>,
    /// Names of the tools that actually ran, in execution order.
    pub executed: Vec<String>,
    pub rounds: u32,
}

impl LoopOutcome {
    pub fn invoked(&self, tool: &str) -> bool {
        self.executed.iter().any(|name| name == tool)
    }
}

/// Drives tool rounds starting from `response`.
pub async fn run(
    chat: &mut dyn ChatHandle,
    response: ModelResponse,
    registry: &ToolRegistry,
    user_id: i64,
    limits: LoopLimits,
) -> LoopOutcome {
    let mut outcome = LoopOutcome {
        response,
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    while outcome.rounds < limits.max_rounds {
        let calls: Vec<FunctionCall> = outcome
            .response
            .function_calls()
            .into_iter()
            .filter(|call| {
                let fresh = seen.insert(signature(call));
                if !fresh {
                    debug!(user_id, tool = %call.name, "skipping repeated tool call");
                }
                fresh
            })
            .cloned()
            .collect();
        if calls.is_empty() {
            break;
        }
        outcome.rounds += 1;

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = registry.execute(user_id, &call.name, &call.args).await;
            collect_urls(&result, &mut outcome.urls, limits.max_urls);
            outcome.executed.push(call.name.clone());
            results.push(FunctionResult {
                name: call.name,
                result,
            });
        }

        match chat.send_function_results(results).await {
            Ok(next) => outcome.response = next,
            Err(e) => {
                warn!(
                    user_id,
                    model = chat.model(),
                    round = outcome.rounds,
                    error = %e,
                    "tool follow-up failed, keeping partial result"
                );
                break;
            }
        }
    }

    if outcome.rounds == limits.max_rounds && !outcome.response.function_calls().is_empty() {
        debug!(user_id, rounds = outcome.rounds, "tool round cap reached");
    }
    outcome
}

/// Dedup key of a call: its name plus arguments with object keys sorted.
pub fn signature(call: &FunctionCall) -> String {
    let mut key = call.name.clone();
    key.push('|');
    write_canonical(&call.args, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:", Value::String(key.clone()));
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

/// Appends marked links from a tool result until `urls` holds `max`.
fn collect_urls(result: &str, urls: &mut Vec<String>, max: usize) {
    for line in result.lines() {
        if urls.len() >= max {
            return;
        }
        if let Some(url) = line.trim().strip_prefix(VIDEO_URL_MARKER) {
            let url = url.trim();
            if !url.is_empty() {
                urls.push(url.to_string());
            }
        }
    }
}
