// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `matbuddy check-config` output.

use std::fmt::Write;

use matbuddy_config::MatbuddyConfig;

/// Human-readable summary of the resolved configuration. Secrets are only
/// reported as set or unset.
pub fn summary(config: &MatbuddyConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "config ok ({})", config.agent.name);
    let _ = writeln!(out, "models:");
    for (i, model) in config.gemini.models.iter().enumerate() {
        let _ = writeln!(out, "  {}. {model}", i + 1);
    }
    let _ = writeln!(
        out,
        "quota: {} per user per day, {} per month overall, footer at {} left",
        config.quota.daily_limit, config.quota.monthly_global_limit, config.quota.footer_threshold
    );
    let _ = writeln!(
        out,
        "retry: {} attempts per model, backoff {}ms..{}ms",
        config.retry.max_attempts, config.retry.initial_backoff_ms, config.retry.max_backoff_ms
    );
    let _ = writeln!(
        out,
        "sessions: {} min idle timeout, at most {}",
        config.session.timeout_minutes, config.session.max_sessions
    );
    let _ = writeln!(out, "data dir: {}", config.storage.data_dir);
    let _ = writeln!(out, "gemini api key: {}", set_or_env(config.gemini.api_key.is_some(), "GEMINI_API_KEY"));
    let _ = writeln!(
        out,
        "telegram bot token: {}",
        set_or_env(config.telegram.bot_token.is_some(), "TELEGRAM_BOT_TOKEN")
    );
    out
}

fn set_or_env(configured: bool, env: &str) -> String {
    if configured {
        "set in config".to_string()
    } else if std::env::var_os(env).is_some() {
        format!("from {env}")
    } else {
        "missing".to_string()
    }
}
