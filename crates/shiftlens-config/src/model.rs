// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the shiftlens service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level shiftlens configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShiftlensConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram bot ingress settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Relational store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Content-addressed blob store settings.
    #[serde(default)]
    pub blob: BlobConfig,

    /// Background dispatcher settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "shiftlens".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot ingress configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables the ingress.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// List of allowed Telegram user IDs or usernames. Empty rejects everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Relational store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Postgres connection URL. `None` disables persistence entirely: no
    /// sessions are stored and the dispatchers never run.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

/// Content-addressed blob store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BlobConfig {
    /// Root directory screenshot blobs are written under.
    #[serde(default = "default_blob_root")]
    pub root_dir: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root_dir: default_blob_root(),
        }
    }
}

fn default_blob_root() -> String {
    "blobs".to_string()
}

/// Background dispatcher configuration, one section per loop.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Closed-session claim dispatcher.
    #[serde(default)]
    pub sessions: SessionsDispatcherConfig,

    /// Pending-notification delivery dispatcher.
    #[serde(default)]
    pub notifications: NotificationsDispatcherConfig,
}

/// Claim dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsDispatcherConfig {
    /// Whether the claim loop runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between claim polls. Values below 1 are raised to 1.
    #[serde(default = "default_sessions_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for SessionsDispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_seconds: default_sessions_poll_seconds(),
        }
    }
}

impl SessionsDispatcherConfig {
    /// Poll interval with the 1-second floor applied.
    pub fn effective_poll_seconds(&self) -> u64 {
        self.poll_seconds.max(1)
    }
}

/// Delivery dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsDispatcherConfig {
    /// Whether the delivery loop runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between delivery polls. Values below 1 are raised to 1.
    #[serde(default = "default_notifications_poll_seconds")]
    pub poll_seconds: u64,

    /// Rows claimed per cycle. Clamped to [1, 100].
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl Default for NotificationsDispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_seconds: default_notifications_poll_seconds(),
            batch_size: default_batch_size(),
        }
    }
}

impl NotificationsDispatcherConfig {
    /// Poll interval with the 1-second floor applied.
    pub fn effective_poll_seconds(&self) -> u64 {
        self.poll_seconds.max(1)
    }

    /// Batch size clamped to [1, 100].
    pub fn effective_batch_size(&self) -> i64 {
        self.batch_size.clamp(1, 100)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_sessions_poll_seconds() -> u64 {
    5
}

fn default_notifications_poll_seconds() -> u64 {
    3
}

fn default_batch_size() -> i64 {
    20
}
