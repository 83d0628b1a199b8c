// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a non-empty model list and coherent backoff bounds.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::MatbuddyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MatbuddyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.gemini.models.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gemini.models must list at least one model".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for model in &config.gemini.models {
        if model.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "gemini.models must not contain empty names".to_string(),
            });
        } else if !seen.insert(model.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("gemini.models lists `{model}` more than once"),
            });
        }
    }

    if config.storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.data_dir must not be empty".to_string(),
        });
    }

    if config.quota.daily_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.daily_limit must be at least 1".to_string(),
        });
    }

    if config.quota.monthly_global_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.monthly_global_limit must be at least 1".to_string(),
        });
    }

    if config.session.timeout_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "session.timeout_minutes must be at least 1".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "retry.max_attempts must be at least 1".to_string(),
        });
    }

    if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "retry.initial_backoff_ms ({}) must not exceed retry.max_backoff_ms ({})",
                config.retry.initial_backoff_ms, config.retry.max_backoff_ms
            ),
        });
    }

    if config.tools.max_rounds == 0 {
        errors.push(ConfigError::Validation {
            message: "tools.max_rounds must be at least 1".to_string(),
        });
    }

    if config.history.max_turns == 0 {
        errors.push(ConfigError::Validation {
            message: "history.max_turns must be at least 1".to_string(),
        });
    }

    if config.guard.max_reply_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "guard.max_reply_chars must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&MatbuddyConfig::default()).is_ok());
    }

    #[test]
    fn empty_model_list_fails_validation() {
        let mut config = MatbuddyConfig::default();
        config.gemini.models.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("gemini.models")));
    }

    #[test]
    fn duplicate_model_fails_validation() {
        let mut config = MatbuddyConfig::default();
        config.gemini.models.push("gemini-2.5-flash".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("more than once")));
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let mut config = MatbuddyConfig::default();
        config.retry.max_attempts = 0;
        config.retry.initial_backoff_ms = 20_000;
        config.tools.max_rounds = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {errors:?}");
    }
}
