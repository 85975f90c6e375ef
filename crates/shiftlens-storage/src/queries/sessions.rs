// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capture session operations: creation, the single-open lookup paths, the
//! locked close, and the skip-locked claim queue for closed sessions.

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use shiftlens_core::{CaptureSession, SessionState, ShiftlensError};

use crate::database::{Database, map_db_err, with_cancel};
use crate::models::{SESSION_COLUMNS, SessionRow, session_from_row};

/// Insert a new open session for `user_id`.
///
/// If the user already has an open session the partial unique index fires
/// and this fails with `UniquenessConflict`; callers recover via
/// [`get_open`].
pub async fn create(
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
) -> Result<CaptureSession, ShiftlensError> {
    let id = Uuid::new_v4();
    with_cancel(cancel, async {
        let sql = format!(
            "INSERT INTO capture.capture_session (id, user_id) \
             VALUES ($1, $2) \
             RETURNING {SESSION_COLUMNS}"
        );
        let row: SessionRow = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_one(db.pool())
            .await
            .map_err(map_db_err)?;
        debug!(session_id = %id, user_id, "capture session created");
        session_from_row(row)
    })
    .await
}

/// The user's most recent open session, or `None`.
pub async fn get_open(
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
) -> Result<Option<CaptureSession>, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} \
             FROM capture.capture_session \
             WHERE user_id = $1 AND state = 'open' \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        row.map(session_from_row).transpose()
    })
    .await
}

/// Return the user's open session, creating one if none exists.
///
/// Two concurrent callers race the insert; `ON CONFLICT DO NOTHING` lets the
/// loser fall through to a re-read, so both end up pointing at the same row.
/// A race window larger than one retry is treated as fatal.
pub async fn get_or_create_open(
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
) -> Result<CaptureSession, ShiftlensError> {
    if let Some(session) = get_open(db, cancel, user_id).await? {
        return Ok(session);
    }

    let inserted = with_cancel(cancel, async {
        let sql = format!(
            "INSERT INTO capture.capture_session (id, user_id) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) WHERE state = 'open' DO NOTHING \
             RETURNING {SESSION_COLUMNS}"
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        row.map(session_from_row).transpose()
    })
    .await?;

    if let Some(session) = inserted {
        return Ok(session);
    }

    get_open(db, cancel, user_id).await?.ok_or_else(|| {
        ShiftlensError::Internal(format!(
            "no open session for user {user_id} after insert conflict"
        ))
    })
}

/// Atomically close the user's most recent open session.
///
/// One statement: the inner select takes the row lock, the update flips the
/// state, the trigger stamps `closed_at`. Returns `None` when the user has
/// no open session; no rows are touched in that case.
pub async fn close_open(
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
) -> Result<Option<CaptureSession>, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = "UPDATE capture.capture_session AS s \
             SET state = 'closed' \
             FROM ( \
                 SELECT id FROM capture.capture_session \
                 WHERE user_id = $1 AND state = 'open' \
                 ORDER BY created_at DESC \
                 LIMIT 1 \
                 FOR UPDATE \
             ) AS open_row \
             WHERE s.id = open_row.id \
             RETURNING s.id, s.user_id, s.state::text, s.created_at, s.closed_at, s.error";
        let row: Option<SessionRow> = sqlx::query_as(sql)
            .bind(user_id)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        row.map(session_from_row).transpose()
    })
    .await
}

/// Claim one closed session for processing, or `None` when nothing is ready.
///
/// The skip-locked read means two concurrent claimers never return the same
/// session. Sessions without any image are never claimed and stay closed.
/// Tie-break: oldest `closed_at`, then oldest `created_at`.
pub async fn claim_next_closed_for_processing(
    db: &Database,
    cancel: &CancellationToken,
) -> Result<Option<CaptureSession>, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = "WITH claimable AS ( \
                 SELECT s.id \
                 FROM capture.capture_session s \
                 WHERE s.state = 'closed' \
                   AND EXISTS ( \
                       SELECT 1 FROM capture.capture_image i WHERE i.session_id = s.id \
                   ) \
                 ORDER BY s.closed_at ASC, s.created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             UPDATE capture.capture_session AS s \
             SET state = 'processing' \
             FROM claimable \
             WHERE s.id = claimable.id \
             RETURNING s.id, s.user_id, s.state::text, s.created_at, s.closed_at, s.error";
        let row: Option<SessionRow> = sqlx::query_as(sql)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        if let Some(row) = &row {
            debug!(session_id = %row.0, "claimed closed session for processing");
        }
        row.map(session_from_row).transpose()
    })
    .await
}

/// Fetch a session by id.
pub async fn get_by_id(
    db: &Database,
    cancel: &CancellationToken,
    id: Uuid,
) -> Result<Option<CaptureSession>, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM capture.capture_session WHERE id = $1"
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        row.map(session_from_row).transpose()
    })
    .await
}

/// Drive a session to `new_state` directly.
///
/// The transition trigger rejects illegal moves with `IllegalTransition`.
/// `error` is only meaningful when moving to `Failed`; the trigger clears it
/// for every other target state.
pub async fn update_state(
    db: &Database,
    cancel: &CancellationToken,
    id: Uuid,
    new_state: SessionState,
    error: Option<&str>,
) -> Result<CaptureSession, ShiftlensError> {
    with_cancel(cancel, async {
        let sql = format!(
            "UPDATE capture.capture_session \
             SET state = $2::capture.capture_session_state, error = $3 \
             WHERE id = $1 \
             RETURNING {SESSION_COLUMNS}"
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(new_state.to_string())
            .bind(error)
            .fetch_optional(db.pool())
            .await
            .map_err(map_db_err)?;
        match row {
            Some(row) => session_from_row(row),
            None => Err(ShiftlensError::NotFound(format!("capture session {id}"))),
        }
    })
    .await
}
