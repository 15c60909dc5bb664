// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{HeraldConfig, RATE_RANGE, WORKERS_RANGE};

/// Smallest accepted worker poll interval.
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.telegram.bot_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
        errors.push(ConfigError::validation(
            "telegram.bot_token must not be empty when set",
        ));
    }

    let broadcast = &config.broadcast;
    let (min_workers, max_workers) = WORKERS_RANGE;
    if !(min_workers..=max_workers).contains(&broadcast.default_workers) {
        errors.push(ConfigError::validation(format!(
            "broadcast.default_workers must be between {min_workers} and {max_workers}, got {}",
            broadcast.default_workers
        )));
    }

    let (min_rate, max_rate) = RATE_RANGE;
    if !(min_rate..=max_rate).contains(&broadcast.default_rate) {
        errors.push(ConfigError::validation(format!(
            "broadcast.default_rate must be between {min_rate} and {max_rate}, got {}",
            broadcast.default_rate
        )));
    }

    if broadcast.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        errors.push(ConfigError::validation(format!(
            "broadcast.poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}, got {}",
            broadcast.poll_interval_ms
        )));
    }

    let gateway = &config.gateway;
    if gateway.enabled {
        let host = gateway.host.trim();
        if host.is_empty() {
            errors.push(ConfigError::validation("gateway.host must not be empty"));
        } else if host.parse::<std::net::IpAddr>().is_err()
            && !host
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
        {
            errors.push(ConfigError::validation(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Checks that only apply when the HTTP gateway is actually served.
///
/// One-shot commands never bind the gateway, so they skip these.
pub fn validate_serving(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let gateway = &config.gateway;

    if !gateway.enabled {
        errors.push(ConfigError::validation(
            "gateway.enabled is false; nothing to serve",
        ));
    } else if gateway
        .bearer_token
        .as_deref()
        .is_none_or(|t| t.trim().is_empty())
    {
        errors.push(ConfigError::validation(
            "gateway.bearer_token is required when the gateway is enabled",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
