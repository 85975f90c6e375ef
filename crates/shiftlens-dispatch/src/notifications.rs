// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery dispatcher: drains the pending notification queue.
//!
//! Same loop shape as the claim dispatcher with a shorter default interval
//! and a batch size. The injected [`NotificationSender`] performs the
//! external chat-API call; this loop owns the batch boundary and the commit
//! semantics.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use shiftlens_config::model::NotificationsDispatcherConfig;
use shiftlens_core::{NotificationSender, ShiftlensError};
use shiftlens_storage::{Database, queries::notifications};

/// Cooperative polling loop around
/// [`dispatch_pending`](notifications::dispatch_pending).
pub struct DeliveryDispatcher {
    db: Database,
    sender: Arc<dyn NotificationSender>,
    config: NotificationsDispatcherConfig,
}

impl DeliveryDispatcher {
    pub fn new(
        db: Database,
        sender: Arc<dyn NotificationSender>,
        config: NotificationsDispatcherConfig,
    ) -> Self {
        Self { db, sender, config }
    }

    /// Run until the token is cancelled.
    ///
    /// When disabled by configuration this logs once and returns. Results
    /// are logged only for cycles that actually claimed rows.
    pub async fn run(self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("notification delivery dispatcher disabled by configuration");
            return;
        }

        let poll = Duration::from_secs(self.config.effective_poll_seconds());
        let batch_size = self.config.effective_batch_size();
        info!(
            poll_seconds = poll.as_secs(),
            batch_size, "notification delivery dispatcher started"
        );

        let mut interval = tokio::time::interval(poll);
        loop {
            tokio::select! {
                _ = interval.tick() => self.cycle(&cancel, batch_size).await,
                _ = cancel.cancelled() => {
                    info!("notification delivery dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn cycle(&self, cancel: &CancellationToken, batch_size: i64) {
        match notifications::dispatch_pending(&self.db, cancel, self.sender.as_ref(), batch_size)
            .await
        {
            Ok(outcome) if outcome.claimed > 0 => {
                info!(
                    claimed = outcome.claimed,
                    sent = outcome.sent,
                    failed = outcome.failed,
                    "dispatched pending notifications"
                );
            }
            Ok(_) => {}
            Err(ShiftlensError::Cancelled) => {
                // Batch rolled back; the select arm handles shutdown.
            }
            Err(e) => {
                warn!(error = %e, "notification delivery cycle failed");
            }
        }
    }
}
