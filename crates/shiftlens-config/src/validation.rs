// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Range fixes (poll floor, batch clamp) are not errors; they are
//! applied by the `effective_*` accessors on the dispatcher sections.

use shiftlens_core::ShiftlensError;

use crate::model::ShiftlensConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors rather than failing fast.
pub fn validate_config(config: &ShiftlensConfig) -> Result<(), Vec<ShiftlensError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ShiftlensError::Config(
            "service.name must not be empty".to_string(),
        ));
    }

    let level = config.service.log_level.trim();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ShiftlensError::Config(format!(
            "service.log_level `{level}` is not one of trace, debug, info, warn, error"
        )));
    }

    if let Some(url) = &config.storage.database_url {
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            errors.push(ShiftlensError::Config(format!(
                "storage.database_url must be a postgres:// URL, got `{url}`"
            )));
        }
    }

    if config.storage.max_connections == 0 {
        errors.push(ShiftlensError::Config(
            "storage.max_connections must be at least 1".to_string(),
        ));
    }

    if config.blob.root_dir.trim().is_empty() {
        errors.push(ShiftlensError::Config(
            "blob.root_dir must not be empty".to_string(),
        ));
    }

    if let Some(token) = &config.telegram.bot_token {
        if token.trim().is_empty() {
            errors.push(ShiftlensError::Config(
                "telegram.bot_token must not be empty when set".to_string(),
            ));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
