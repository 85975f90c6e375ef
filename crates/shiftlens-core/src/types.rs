// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the shiftlens workspace.
//!
//! These mirror the rows in the `capture` schema one to one. The storage
//! crate maps query results into them; the ingress adapter and dispatchers
//! only ever see these types, never driver rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle state of a capture session.
///
/// Legal transitions form a directed graph enforced by a trigger in the
/// store: `Open -> {Closed, Failed}`, `Closed -> {Processing, Failed}`,
/// `Processing -> {Done, Failed}`. Everything else is rejected and
/// self-transitions are no-ops.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Closed,
    Processing,
    Done,
    Failed,
}

/// A user-scoped grouping of schedule screenshot uploads.
///
/// At most one session per user is `Open` at any time, enforced by a partial
/// unique index in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Opaque session identifier.
    pub id: Uuid,
    /// Telegram user the session belongs to.
    pub user_id: i64,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Creation timestamp, assigned by the store.
    pub created_at: DateTime<Utc>,
    /// Stamped by the store on the first transition out of `Open`.
    pub closed_at: Option<DateTime<Utc>>,
    /// Set exactly when `state` is `Failed`.
    pub error: Option<String>,
}

/// A single stored screenshot within a session. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureImage {
    /// Opaque image identifier.
    pub id: Uuid,
    /// Parent session.
    pub session_id: Uuid,
    /// 1-based, gap-free position within the session.
    pub sequence: i32,
    /// Content-addressed blob key, globally unique.
    pub object_key: String,
    /// Telegram message id of the upload, unique within the session when set.
    pub external_message_id: Option<i64>,
    /// Insertion timestamp, assigned by the store.
    pub created_at: DateTime<Utc>,
}

/// Delivery status of an outbound schedule notification.
///
/// Terminal after `Sent` or `Failed`; the dispatcher never retries a row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

/// An outbound notification queued for delivery to a user.
///
/// The payload fields past `sent_at` are written by upstream producers and
/// carried opaquely; the dispatcher only reads `user_id` and `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleNotification {
    /// Opaque string identifier assigned by the producer.
    pub notification_id: String,
    /// Telegram user (and chat) the message is delivered to.
    pub user_id: i64,
    /// Message text to deliver verbatim.
    pub message: String,
    /// Delivery status.
    pub status: NotificationStatus,
    /// Insertion timestamp, assigned by the store.
    pub created_at: DateTime<Utc>,
    /// Set exactly when `status` is `Sent`.
    pub sent_at: Option<DateTime<Utc>>,
    /// Schedule day the notification refers to.
    pub schedule_date: Option<NaiveDate>,
    /// Capture session the notification was derived from.
    pub session_id: Option<Uuid>,
    /// Producer-defined notification kind.
    pub notification_type: Option<String>,
    /// Producer-defined schedule event ids.
    pub event_ids: Vec<String>,
}

/// Insert shape for a new pending notification.
#[derive(Debug, Clone)]
pub struct NewScheduleNotification {
    pub notification_id: String,
    pub user_id: i64,
    pub message: String,
    pub schedule_date: Option<NaiveDate>,
    pub session_id: Option<Uuid>,
    pub notification_type: Option<String>,
    pub event_ids: Vec<String>,
}

/// Result of one notification dispatch cycle.
///
/// `sent + failed == claimed` unless the cycle was cancelled mid-batch, in
/// which case nothing was committed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_state_round_trips_lowercase() {
        let states = [
            SessionState::Open,
            SessionState::Closed,
            SessionState::Processing,
            SessionState::Done,
            SessionState::Failed,
        ];
        for state in states {
            let text = state.to_string();
            assert_eq!(text, text.to_lowercase());
            assert_eq!(SessionState::from_str(&text).unwrap(), state);
        }
    }

    #[test]
    fn unknown_session_state_fails_to_parse() {
        assert!(SessionState::from_str("archived").is_err());
    }

    #[test]
    fn notification_status_round_trips_lowercase() {
        for status in [
            NotificationStatus::Pending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
        ] {
            let text = status.to_string();
            assert_eq!(NotificationStatus::from_str(&text).unwrap(), status);
        }
    }

    #[test]
    fn session_state_serde_matches_store_labels() {
        let json = serde_json::to_string(&SessionState::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
        let parsed: SessionState = serde_json::from_str(r#""failed""#).unwrap();
        assert_eq!(parsed, SessionState::Failed);
    }

    #[test]
    fn dispatch_outcome_defaults_to_zero() {
        let outcome = DispatchOutcome::default();
        assert_eq!(outcome.claimed, 0);
        assert_eq!(outcome.sent, 0);
        assert_eq!(outcome.failed, 0);
    }
}
