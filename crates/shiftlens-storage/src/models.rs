// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row shapes and conversions between driver tuples and domain types.
//!
//! Enum columns are selected as `::text` and parsed back through the strum
//! string forms so the domain types stay free of driver derives.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use shiftlens_core::{
    CaptureImage, CaptureSession, NotificationStatus, ScheduleNotification, SessionState,
    ShiftlensError,
};

/// Column list matching [`SessionRow`]; keep the two in sync.
pub(crate) const SESSION_COLUMNS: &str = "id, user_id, state::text, created_at, closed_at, error";

pub(crate) type SessionRow = (
    Uuid,
    i64,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<String>,
);

pub(crate) fn session_from_row(row: SessionRow) -> Result<CaptureSession, ShiftlensError> {
    let (id, user_id, state, created_at, closed_at, error) = row;
    let state = state
        .parse::<SessionState>()
        .map_err(|_| ShiftlensError::Internal(format!("unknown session state `{state}`")))?;
    Ok(CaptureSession {
        id,
        user_id,
        state,
        created_at,
        closed_at,
        error,
    })
}

/// Column list matching [`ImageRow`]; keep the two in sync.
pub(crate) const IMAGE_COLUMNS: &str =
    "id, session_id, sequence, object_key, external_message_id, created_at";

pub(crate) type ImageRow = (Uuid, Uuid, i32, String, Option<i64>, DateTime<Utc>);

pub(crate) fn image_from_row(row: ImageRow) -> CaptureImage {
    let (id, session_id, sequence, object_key, external_message_id, created_at) = row;
    CaptureImage {
        id,
        session_id,
        sequence,
        object_key,
        external_message_id,
        created_at,
    }
}

/// Column list matching [`NotificationRow`]; keep the two in sync.
pub(crate) const NOTIFICATION_COLUMNS: &str = "notification_id, user_id, message, status, \
     created_at, sent_at, schedule_date, session_id, notification_type, event_ids";

pub(crate) type NotificationRow = (
    String,
    i64,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<NaiveDate>,
    Option<Uuid>,
    Option<String>,
    Vec<String>,
);

pub(crate) fn notification_from_row(
    row: NotificationRow,
) -> Result<ScheduleNotification, ShiftlensError> {
    let (
        notification_id,
        user_id,
        message,
        status,
        created_at,
        sent_at,
        schedule_date,
        session_id,
        notification_type,
        event_ids,
    ) = row;
    let status = status
        .parse::<NotificationStatus>()
        .map_err(|_| ShiftlensError::Internal(format!("unknown notification status `{status}`")))?;
    Ok(ScheduleNotification {
        notification_id,
        user_id,
        message,
        status,
        created_at,
        sent_at,
        schedule_date,
        session_id,
        notification_type,
        event_ids,
    })
}
