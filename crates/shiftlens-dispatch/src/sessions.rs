// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim dispatcher: periodically promotes one closed session per cycle.
//!
//! The dispatcher only guarantees the claim; the actual OCR invocation is
//! the downstream worker's responsibility. Concurrent instances are safe:
//! the skip-locked claim hands each closed session to at most one of them.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shiftlens_config::model::SessionsDispatcherConfig;
use shiftlens_core::ShiftlensError;
use shiftlens_storage::{Database, queries::sessions};

/// Cooperative polling loop around
/// [`claim_next_closed_for_processing`](sessions::claim_next_closed_for_processing).
pub struct ClaimDispatcher {
    db: Database,
    config: SessionsDispatcherConfig,
}

impl ClaimDispatcher {
    pub fn new(db: Database, config: SessionsDispatcherConfig) -> Self {
        Self { db, config }
    }

    /// Run until the token is cancelled.
    ///
    /// When disabled by configuration this logs once and returns. Each cycle
    /// claims at most one session; errors are logged and the loop continues
    /// on the next tick.
    pub async fn run(self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("session claim dispatcher disabled by configuration");
            return;
        }

        let poll = Duration::from_secs(self.config.effective_poll_seconds());
        info!(poll_seconds = poll.as_secs(), "session claim dispatcher started");

        let mut interval = tokio::time::interval(poll);
        loop {
            tokio::select! {
                _ = interval.tick() => self.cycle(&cancel).await,
                _ = cancel.cancelled() => {
                    info!("session claim dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn cycle(&self, cancel: &CancellationToken) {
        match sessions::claim_next_closed_for_processing(&self.db, cancel).await {
            Ok(Some(session)) => {
                info!(
                    session_id = %session.id,
                    user_id = session.user_id,
                    state = %session.state,
                    "claimed closed session for processing"
                );
            }
            Ok(None) => {
                debug!("no closed sessions ready for processing");
            }
            Err(ShiftlensError::Cancelled) => {
                // The select arm handles shutdown; nothing to log here.
            }
            Err(e) => {
                warn!(error = %e, "session claim cycle failed");
            }
        }
    }
}
