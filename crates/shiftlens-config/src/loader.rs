// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./shiftlens.toml` > `~/.config/shiftlens/shiftlens.toml`
//! > `/etc/shiftlens/shiftlens.toml` with environment variable overrides via
//! the `SHIFTLENS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ShiftlensConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/shiftlens/shiftlens.toml` (system-wide)
/// 3. `~/.config/shiftlens/shiftlens.toml` (user XDG config)
/// 4. `./shiftlens.toml` (local directory)
/// 5. `SHIFTLENS_*` environment variables
pub fn load_config() -> Result<ShiftlensConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShiftlensConfig::default()))
        .merge(Toml::file("/etc/shiftlens/shiftlens.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("shiftlens/shiftlens.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("shiftlens.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from inline TOML only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ShiftlensConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShiftlensConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShiftlensConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShiftlensConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SHIFTLENS_STORAGE_DATABASE_URL` must map
/// to `storage.database_url`, not `storage.database.url`.
fn env_provider() -> Env {
    Env::prefixed("SHIFTLENS_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: SHIFTLENS_DISPATCHER_SESSIONS_POLL_SECONDS
        //       -> "dispatcher_sessions_poll_seconds"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("blob_", "blob.", 1)
            .replacen("dispatcher_sessions_", "dispatcher.sessions.", 1)
            .replacen("dispatcher_notifications_", "dispatcher.notifications.", 1);
        mapped.into()
    })
}
