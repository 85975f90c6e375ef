// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image append protocol: gap-free per-session sequences under concurrency.
//!
//! The session row lock serializes all writers for one session, so no two
//! appends can observe the same `MAX(sequence)`. Writes to different
//! sessions proceed in parallel. The unique `(session_id, sequence)` index
//! turns any violation into a hard error rather than silent corruption.

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use shiftlens_core::{CaptureImage, ShiftlensError};

use crate::database::{Database, map_db_err, with_cancel};
use crate::models::{IMAGE_COLUMNS, ImageRow, image_from_row};

/// Append the next image to a session.
///
/// Runs in one transaction: lock the session row, read `MAX(sequence) + 1`,
/// insert. The BEFORE INSERT trigger re-checks that the session is open and
/// rejects with `IllegalState` otherwise; a missing session fails with
/// `NotFound` before the sequence is read. A duplicate `object_key` fails
/// with `UniquenessConflict` and leaves the first insert untouched, which is
/// the idempotent-retry signal for the caller.
pub async fn append_next(
    db: &Database,
    cancel: &CancellationToken,
    session_id: Uuid,
    object_key: &str,
    external_message_id: Option<i64>,
) -> Result<CaptureImage, ShiftlensError> {
    with_cancel(cancel, async {
        let mut tx = db.pool().begin().await.map_err(map_db_err)?;

        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM capture.capture_session WHERE id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;
        if locked.is_none() {
            return Err(ShiftlensError::NotFound(format!(
                "capture session {session_id}"
            )));
        }

        let next_sequence: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence), 0) + 1 \
             FROM capture.capture_image \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO capture.capture_image \
             (id, session_id, sequence, object_key, external_message_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {IMAGE_COLUMNS}"
        );
        let row: ImageRow = sqlx::query_as(&sql)
            .bind(id)
            .bind(session_id)
            .bind(next_sequence)
            .bind(object_key)
            .bind(external_message_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        debug!(
            session_id = %session_id,
            sequence = next_sequence,
            object_key,
            "capture image appended"
        );
        Ok(image_from_row(row))
    })
    .await
}

/// Number of images stored for a session.
pub async fn count_by_session(
    db: &Database,
    cancel: &CancellationToken,
    session_id: Uuid,
) -> Result<i64, ShiftlensError> {
    with_cancel(cancel, async {
        sqlx::query_scalar("SELECT COUNT(*) FROM capture.capture_image WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(db.pool())
            .await
            .map_err(map_db_err)
    })
    .await
}

/// All images of a session in sequence order.
pub async fn list_by_session(
    db: &Database,
    cancel: &CancellationToken,
    session_id: Uuid,
) -> Result<Vec<CaptureImage>, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} \
             FROM capture.capture_image \
             WHERE session_id = $1 \
             ORDER BY sequence ASC"
        );
        let rows: Vec<ImageRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_all(db.pool())
            .await
            .map_err(map_db_err)?;
        Ok(rows.into_iter().map(image_from_row).collect())
    })
    .await
}
