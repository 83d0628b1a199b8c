// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./matbuddy.toml` > `~/.config/matbuddy/matbuddy.toml` >
//! `/etc/matbuddy/matbuddy.toml` with environment variable overrides via `MATBUDDY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MatbuddyConfig;

/// Top-level sections addressable from the environment.
const SECTIONS: &[&str] = &[
    "agent", "telegram", "gemini", "storage", "quota", "session", "retry", "tools", "history",
    "guard",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/matbuddy/matbuddy.toml` (system-wide)
/// 3. `~/.config/matbuddy/matbuddy.toml` (user XDG config)
/// 4. `./matbuddy.toml` (local directory)
/// 5. `MATBUDDY_*` environment variables
pub fn load_config() -> Result<MatbuddyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MatbuddyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MatbuddyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MatbuddyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MatbuddyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MatbuddyConfig::default()))
        .merge(Toml::file("/etc/matbuddy/matbuddy.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("matbuddy/matbuddy.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("matbuddy.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `MATBUDDY_QUOTA_DAILY_LIMIT` must land on `quota.daily_limit`, not
/// `quota.daily.limit`, so keys are split only at the section boundary.
fn env_provider() -> Env {
    Env::prefixed("MATBUDDY_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key to a dotted config path.
pub fn env_key_to_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_at_section_only() {
        assert_eq!(env_key_to_path("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(env_key_to_path("quota_monthly_global_limit"), "quota.monthly_global_limit");
        assert_eq!(env_key_to_path("retry_initial_backoff_ms"), "retry.initial_backoff_ms");
        assert_eq!(env_key_to_path("unrelated"), "unrelated");
    }
}
