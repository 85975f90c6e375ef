// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the shiftlens capture service.

use thiserror::Error;

/// The primary error type used across all shiftlens crates.
///
/// Repositories translate store-level codes into these kinds and never leak
/// driver types. Callers pattern-match on the kind: a `UniquenessConflict` is
/// a signal to reconcile by rereading state, an `IllegalState` is surfaced to
/// the user as a benign reply, a `Transient` is retried on the next poll.
#[derive(Debug, Error)]
pub enum ShiftlensError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A store uniqueness constraint fired. Not fatal: the caller rereads.
    #[error("uniqueness conflict on `{constraint}`")]
    UniquenessConflict { constraint: String },

    /// A domain guard rejected the write (e.g. appending to a non-open session).
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The session transition validator rejected the update.
    #[error("illegal transition: {0}")]
    IllegalTransition(String),

    /// The targeted row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection reset, pool timeout, and other retryable store failures.
    #[error("transient store error: {source}")]
    Transient {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Cooperative cancellation. Never written as a status.
    #[error("operation cancelled")]
    Cancelled,

    /// Chat transport errors (send failure, download failure, bad chat id).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invariant violations and other unexpected errors. Fatal for the operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShiftlensError {
    /// Whether a dispatcher should retry on the next tick rather than treat
    /// the cycle as broken.
    pub fn is_transient(&self) -> bool {
        matches!(self, ShiftlensError::Transient { .. })
    }
}
