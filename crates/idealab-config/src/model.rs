// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the IdéaLab voting core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Table names of [`IdeaLabConfig`], in declaration order.
pub const SECTIONS: &[&str] = &[
    "server", "storage", "auth", "identity", "guard", "voting", "comments",
];

/// Top-level IdéaLab configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdeaLabConfig {
    /// HTTP listener and execution mode.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Bearer credential verification.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Anonymous session cookie settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Abuse guard thresholds.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Vote restriction policy.
    #[serde(default)]
    pub voting: VotingConfig,

    /// Comment validation and paging.
    #[serde(default)]
    pub comments: CommentsConfig,
}

/// Execution mode. Production turns on `Secure` cookies and removes the
/// loopback exemption from the deny-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("idealab").join("idealab.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("idealab.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Bearer credential configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret. `None` disables bearer credentials entirely.
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

/// Anonymous session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_session_max_age_days")]
    pub session_max_age_days: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            session_max_age_days: default_session_max_age_days(),
        }
    }
}

fn default_cookie_name() -> String {
    "anonymous_session_id".to_string()
}

fn default_session_max_age_days() -> u32 {
    30
}

/// Abuse guard thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Addresses that are always denied.
    #[serde(default)]
    pub blocked_addresses: Vec<String>,

    /// Vote actions allowed per address per window.
    #[serde(default = "default_vote_ceiling")]
    pub vote_ceiling_per_hour: u32,

    /// Comment actions allowed per address per window.
    #[serde(default = "default_comment_ceiling")]
    pub comment_ceiling_per_hour: u32,

    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    /// Two actions closer together than this count as rapid.
    #[serde(default = "default_rapid_interval_ms")]
    pub rapid_interval_ms: u64,

    #[serde(default = "default_rapid_action_limit")]
    pub rapid_action_limit: u32,

    #[serde(default = "default_lifetime_action_limit")]
    pub lifetime_action_limit: u32,

    /// Behavior entries idle longer than this are swept.
    #[serde(default = "default_behavior_idle_secs")]
    pub behavior_idle_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            blocked_addresses: Vec::new(),
            vote_ceiling_per_hour: default_vote_ceiling(),
            comment_ceiling_per_hour: default_comment_ceiling(),
            rate_window_secs: default_rate_window_secs(),
            rapid_interval_ms: default_rapid_interval_ms(),
            rapid_action_limit: default_rapid_action_limit(),
            lifetime_action_limit: default_lifetime_action_limit(),
            behavior_idle_secs: default_behavior_idle_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_vote_ceiling() -> u32 {
    50
}

fn default_comment_ceiling() -> u32 {
    10
}

fn default_rate_window_secs() -> u64 {
    3600
}

fn default_rapid_interval_ms() -> u64 {
    2000
}

fn default_rapid_action_limit() -> u32 {
    5
}

fn default_lifetime_action_limit() -> u32 {
    100
}

fn default_behavior_idle_secs() -> u64 {
    86_400
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

/// How anonymous votes are deduplicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymousMode {
    /// One record per session token.
    #[default]
    Session,
    /// Session scoping plus one anonymous voter per address.
    Ip,
    /// Same checks as `Ip`, named for configurations that want both explicit.
    Both,
}

impl AnonymousMode {
    /// Whether the per-address check applies.
    pub fn checks_address(&self) -> bool {
        matches!(self, Self::Ip | Self::Both)
    }
}

/// Vote restriction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VotingConfig {
    #[serde(default)]
    pub anonymous_mode: AnonymousMode,

    /// Lookback for the per-address check.
    #[serde(default = "default_ip_restriction_hours")]
    pub ip_restriction_hours: u32,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            anonymous_mode: AnonymousMode::default(),
            ip_restriction_hours: default_ip_restriction_hours(),
        }
    }
}

fn default_ip_restriction_hours() -> u32 {
    24
}

/// Comment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommentsConfig {
    /// Minimum content length in characters, after trimming.
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Default and maximum page size for listings.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            page_size: default_page_size(),
        }
    }
}

fn default_min_length() -> usize {
    3
}

fn default_max_length() -> usize {
    2000
}

fn default_page_size() -> u32 {
    20
}
