// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./herald.toml` > `~/.config/herald/herald.toml` >
//! `/etc/herald/herald.toml`, with `HERALD_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use tracing::debug;

use crate::model::HeraldConfig;

/// Top-level sections an environment variable can address.
const SECTIONS: &[&str] = &[
    "service",
    "telegram",
    "storage",
    "gateway",
    "broadcast",
    "metrics",
];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/herald/herald.toml";
pub(crate) const LOCAL_CONFIG: &str = "herald.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("herald/herald.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/herald/herald.toml`
/// 3. `~/.config/herald/herald.toml`
/// 4. `./herald.toml`
/// 5. `HERALD_*` environment variables
pub fn load_config() -> Result<HeraldConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<HeraldConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HeraldConfig, figment::Error> {
    debug!(path = %path.display(), "merging config file");
    Figment::new()
        .merge(Serialized::defaults(HeraldConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The un-extracted Figment for the standard hierarchy.
pub fn build_figment() -> Figment {
    let files = [
        PathBuf::from(SYSTEM_CONFIG),
        user_config_path().unwrap_or_default(),
        PathBuf::from(LOCAL_CONFIG),
    ];

    let mut figment = Figment::new().merge(Serialized::defaults(HeraldConfig::default()));
    for file in files {
        if file.is_file() {
            debug!(path = %file.display(), "merging config file");
        }
        figment = figment.merge(Toml::file(file));
    }
    figment.merge(env_provider())
}

/// `HERALD_TELEGRAM_BOT_TOKEN` must land on `telegram.bot_token`, so only the
/// first underscore after a known section name becomes a dot.
fn env_provider() -> Env {
    Env::prefixed("HERALD_").map(|key| env_key_to_path(key.as_str()).into())
}

pub(crate) fn env_key_to_path(key: &str) -> String {
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
    use tracing_test::traced_test;

    #[test]
    fn env_keys_map_to_section_paths() {
        assert_eq!(env_key_to_path("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(
            env_key_to_path("broadcast_default_workers"),
            "broadcast.default_workers"
        );
        assert_eq!(env_key_to_path("gateway_bearer_token"), "gateway.bearer_token");
        assert_eq!(env_key_to_path("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "herald.toml",
                r#"
[broadcast]
default_rate = 20
"#,
            )?;
            jail.set_env("HERALD_BROADCAST_DEFAULT_RATE", "50");
            jail.set_env("HERALD_TELEGRAM_BOT_TOKEN", "123:ABC");
            let config = load_config_from_path(Path::new("herald.toml"))?;
            assert_eq!(config.broadcast.default_rate, 50);
            assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
            Ok(())
        });
    }

    #[traced_test]
    #[test]
    fn merged_files_are_logged() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("herald.toml", "[broadcast]\ndefault_workers = 7\n")?;
            let config: HeraldConfig = build_figment().extract()?;
            assert_eq!(config.broadcast.default_workers, 7);
            Ok(())
        });
        assert!(logs_contain("merging config file"));
        assert!(logs_contain("herald.toml"));
    }
}
