// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for matbuddy.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level matbuddy configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to the values the bot ships with.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatbuddyConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Gemini API settings and the ordered model candidate list.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Where user records and the global usage file live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-user daily and global monthly message budgets.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Cached conversation handles.
    #[serde(default)]
    pub session: SessionConfig,

    /// Per-candidate retry and backoff.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Tool-call loop bounds.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Persisted conversation history.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Input filter and reply sanitizer.
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a file containing the system prompt.
    /// Takes precedence over `system_prompt` if both are set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "matbuddy".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Falls back to `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram user ids or usernames allowed to talk to the assistant.
    /// Empty means everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. Falls back to `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model candidates in priority order, cheapest first.
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// API base URL.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            models: default_models(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_gemini_timeout_secs(),
        }
    }
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-2.5-flash-lite".to_string(),
        "gemini-2.5-flash".to_string(),
        "gemini-2.0-flash-lite-001".to_string(),
    ]
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    60
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding `user_<id>.json` files and `global_ai_usage.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("matbuddy"))
        .unwrap_or_else(|| std::path::PathBuf::from("data"))
        .display()
        .to_string()
}

/// Message budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// AI messages each user may send per day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// AI messages the whole deployment may send per month.
    #[serde(default = "default_monthly_global_limit")]
    pub monthly_global_limit: u64,

    /// Append the remaining-messages footer when at most this many are left.
    #[serde(default = "default_footer_threshold")]
    pub footer_threshold: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            monthly_global_limit: default_monthly_global_limit(),
            footer_threshold: default_footer_threshold(),
        }
    }
}

fn default_daily_limit() -> u32 {
    100
}

fn default_monthly_global_limit() -> u64 {
    10_000
}

fn default_footer_threshold() -> u32 {
    3
}

/// Session cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Idle minutes after which a cached conversation is discarded.
    #[serde(default = "default_session_timeout_minutes")]
    pub timeout_minutes: u64,

    /// Sweep idle sessions once more than this many are cached.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_session_timeout_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_session_timeout_minutes() -> u64 {
    30
}

fn default_max_sessions() -> usize {
    200
}

/// Retry and backoff configuration, applied per model candidate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempts per candidate before moving on.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles each time after.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

/// Tool-call loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Maximum model/tool exchanges per turn.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Maximum video links attached to one reply.
    #[serde(default = "default_max_collected_urls")]
    pub max_collected_urls: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_collected_urls: default_max_collected_urls(),
        }
    }
}

fn default_max_rounds() -> u32 {
    5
}

fn default_max_collected_urls() -> usize {
    3
}

/// Conversation history configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Exchanges kept per user. Two entries are stored per exchange.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

impl HistoryConfig {
    /// Number of stored entries (user + model) kept per user.
    pub fn max_entries(&self) -> usize {
        self.max_turns * 2
    }
}

fn default_max_turns() -> usize {
    20
}

/// Guard filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Character ceiling for a sanitized reply, before the ellipsis.
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,

    /// Keywords rejected in addition to the built-in list.
    #[serde(default)]
    pub extra_banned_keywords: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_reply_chars: default_max_reply_chars(),
            extra_banned_keywords: Vec::new(),
        }
    }
}

fn default_max_reply_chars() -> usize {
    2000
}
