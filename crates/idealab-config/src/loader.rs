// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./idealab.toml` > `~/.config/idealab/idealab.toml` > `/etc/idealab/idealab.toml`
//! with environment variable overrides via `IDEALAB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::{IdeaLabConfig, SECTIONS};

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/idealab/idealab.toml";

/// Local config file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "idealab.toml";

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "IDEALAB_";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/idealab/idealab.toml` (system-wide)
/// 3. `~/.config/idealab/idealab.toml` (user XDG config)
/// 4. `./idealab.toml` (local directory)
/// 5. `IDEALAB_*` environment variables
pub fn load_config() -> Result<IdeaLabConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<IdeaLabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IdeaLabConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<IdeaLabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IdeaLabConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(IdeaLabConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/idealab/idealab.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("idealab").join("idealab.toml"))
}

/// Environment provider mapping `IDEALAB_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after the section name is a separator, so
/// `IDEALAB_GUARD_VOTE_CEILING_PER_HOUR` maps to `guard.vote_ceiling_per_hour`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
