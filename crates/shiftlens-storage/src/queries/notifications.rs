// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification queue: skip-locked batch claim and per-row commit.
//!
//! Delivery is at-least-once (a crash after the chat-API call but before the
//! commit redelivers on the next poll) while the status write is
//! at-most-once: all per-row updates commit atomically with the batch, and
//! concurrent dispatchers never observe the same row thanks to the
//! skip-locked read.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use shiftlens_core::{
    DispatchOutcome, NewScheduleNotification, NotificationSender, ScheduleNotification,
    ShiftlensError,
};

use crate::database::{Database, map_db_err, with_cancel};
use crate::models::{NOTIFICATION_COLUMNS, NotificationRow, notification_from_row};

/// Insert a new pending notification.
///
/// Producers live upstream of this crate; this is the insert they (and the
/// tests) go through.
pub async fn enqueue(
    db: &Database,
    cancel: &CancellationToken,
    notification: &NewScheduleNotification,
) -> Result<(), ShiftlensError> {
    with_cancel(cancel, async {
        sqlx::query(
            "INSERT INTO capture.schedule_notification \
             (notification_id, user_id, message, schedule_date, session_id, \
              notification_type, event_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&notification.notification_id)
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.schedule_date)
        .bind(notification.session_id)
        .bind(&notification.notification_type)
        .bind(&notification.event_ids)
        .execute(db.pool())
        .await
        .map_err(map_db_err)?;
        Ok(())
    })
    .await
}

/// Fetch a notification by id.
pub async fn get_by_id(
    db: &Database,
    cancel: &CancellationToken,
    notification_id: &str,
) -> Result<Option<ScheduleNotification>, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} \
             FROM capture.schedule_notification \
             WHERE notification_id = $1"
        );
        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(notification_id)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        row.map(notification_from_row).transpose()
    })
    .await
}

/// Claim up to `batch_size` pending notifications and deliver them.
///
/// One transaction brackets the whole cycle. The claimed rows are delivered
/// in `(created_at, notification_id)` order; each send outcome is written to
/// its row inside the same transaction and everything commits together.
/// Cancellation during a send propagates immediately without any status
/// write: the transaction drops and the rows stay pending.
pub async fn dispatch_pending(
    db: &Database,
    cancel: &CancellationToken,
    sender: &dyn NotificationSender,
    batch_size: i64,
) -> Result<DispatchOutcome, ShiftlensError> {
    let mut tx = db.pool().begin().await.map_err(map_db_err)?;

    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} \
         FROM capture.schedule_notification \
         WHERE status = 'pending' \
         ORDER BY created_at ASC, notification_id ASC \
         LIMIT $1 \
         FOR UPDATE SKIP LOCKED"
    );
    let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
        .bind(batch_size)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_err)?;

    let mut outcome = DispatchOutcome {
        claimed: rows.len(),
        ..DispatchOutcome::default()
    };

    for row in rows {
        let notification = notification_from_row(row)?;

        let delivery = with_cancel(cancel, sender.send(&notification)).await;
        match delivery {
            Ok(()) => {
                sqlx::query(
                    "UPDATE capture.schedule_notification \
                     SET status = 'sent', sent_at = now() \
                     WHERE notification_id = $1",
                )
                .bind(&notification.notification_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
                outcome.sent += 1;
            }
            Err(ShiftlensError::Cancelled) => return Err(ShiftlensError::Cancelled),
            Err(e) => {
                warn!(
                    notification_id = %notification.notification_id,
                    user_id = notification.user_id,
                    error = %e,
                    "notification delivery failed"
                );
                sqlx::query(
                    "UPDATE capture.schedule_notification \
                     SET status = 'failed' \
                     WHERE notification_id = $1",
                )
                .bind(&notification.notification_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
                outcome.failed += 1;
            }
        }
    }

    tx.commit().await.map_err(map_db_err)?;

    if outcome.claimed > 0 {
        debug!(
            claimed = outcome.claimed,
            sent = outcome.sent,
            failed = outcome.failed,
            "notification batch committed"
        );
    }
    Ok(outcome)
}
