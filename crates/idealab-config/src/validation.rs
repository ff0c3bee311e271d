// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as parseable addresses, non-empty paths, and non-zero thresholds.

use crate::diagnostic::ConfigError;
use crate::model::IdeaLabConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &IdeaLabConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(validation("server.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(validation(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty"));
    }

    if let Some(secret) = &config.auth.jwt_secret
        && secret.trim().is_empty()
    {
        errors.push(validation(
            "auth.jwt_secret must not be empty when set; remove it to disable bearer credentials",
        ));
    }

    if config.identity.cookie_name.trim().is_empty() {
        errors.push(validation("identity.cookie_name must not be empty"));
    }
    if config.identity.session_max_age_days == 0 {
        errors.push(validation("identity.session_max_age_days must be at least 1"));
    }

    for (i, addr) in config.guard.blocked_addresses.iter().enumerate() {
        if addr.trim().parse::<std::net::IpAddr>().is_err() {
            errors.push(validation(format!(
                "guard.blocked_addresses[{i}] `{addr}` is not a valid IP address"
            )));
        }
    }

    let guard = &config.guard;
    for (key, value) in [
        ("guard.vote_ceiling_per_hour", u64::from(guard.vote_ceiling_per_hour)),
        ("guard.comment_ceiling_per_hour", u64::from(guard.comment_ceiling_per_hour)),
        ("guard.rate_window_secs", guard.rate_window_secs),
        ("guard.rapid_interval_ms", guard.rapid_interval_ms),
        ("guard.lifetime_action_limit", u64::from(guard.lifetime_action_limit)),
        ("guard.behavior_idle_secs", guard.behavior_idle_secs),
        ("guard.sweep_interval_secs", guard.sweep_interval_secs),
        ("voting.ip_restriction_hours", u64::from(config.voting.ip_restriction_hours)),
        ("comments.page_size", u64::from(config.comments.page_size)),
    ] {
        if value == 0 {
            errors.push(validation(format!("{key} must be greater than 0")));
        }
    }

    if config.comments.min_length > config.comments.max_length {
        errors.push(validation(format!(
            "comments.min_length ({}) must not exceed comments.max_length ({})",
            config.comments.min_length, config.comments.max_length
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
