// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification queue tests: batch claim order, the sent/failed mix,
//! at-most-once status writes, and cancellation mid-batch.

mod common;

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shiftlens_core::{
    NewScheduleNotification, NotificationSender, NotificationStatus, ScheduleNotification,
    ShiftlensError,
};
use shiftlens_storage::Database;
use shiftlens_storage::queries::notifications;

/// Test sender that records deliveries and fails the configured ids.
struct ScriptedSender {
    fail_ids: HashSet<String>,
    delivered: Mutex<Vec<String>>,
}

impl ScriptedSender {
    fn new(fail_ids: &[&str]) -> Self {
        Self {
            fail_ids: fail_ids.iter().map(|s| s.to_string()).collect(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    async fn delivered(&self) -> Vec<String> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for ScriptedSender {
    async fn send(&self, notification: &ScheduleNotification) -> Result<(), ShiftlensError> {
        if self.fail_ids.contains(&notification.notification_id) {
            return Err(ShiftlensError::Channel {
                message: "scripted delivery failure".into(),
                source: None,
            });
        }
        self.delivered
            .lock()
            .await
            .push(notification.notification_id.clone());
        Ok(())
    }
}

/// Sender that reports cancellation, as the chat client does when the
/// ambient token fires mid-call.
struct CancellingSender;

#[async_trait]
impl NotificationSender for CancellingSender {
    async fn send(&self, _notification: &ScheduleNotification) -> Result<(), ShiftlensError> {
        Err(ShiftlensError::Cancelled)
    }
}

fn pending(id: &str, user_id: i64) -> NewScheduleNotification {
    NewScheduleNotification {
        notification_id: id.to_string(),
        user_id,
        message: format!("schedule update {id}"),
        schedule_date: None,
        session_id: None,
        notification_type: Some("schedule_change".to_string()),
        event_ids: vec![],
    }
}

async fn status_of(db: &Database, id: &str) -> (String, bool) {
    let (status, sent_at): (String, Option<chrono::DateTime<chrono::Utc>>) = sqlx::query_as(
        "SELECT status, sent_at FROM capture.schedule_notification WHERE notification_id = $1",
    )
    .bind(id)
    .fetch_one(db.pool())
    .await
    .unwrap();
    (status, sent_at.is_some())
}

#[tokio::test]
async fn empty_queue_dispatches_nothing() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    let sender = ScriptedSender::new(&[]);
    let outcome = notifications::dispatch_pending(&db, &cancel, &sender, 20)
        .await
        .unwrap();
    assert_eq!(outcome.claimed, 0);
    assert_eq!(outcome.sent, 0);
    assert_eq!(outcome.failed, 0);
}

#[tokio::test]
async fn success_and_failure_mix_is_committed_per_row() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    notifications::enqueue(&db, &cancel, &pending("n-1", 7)).await.unwrap();
    notifications::enqueue(&db, &cancel, &pending("n-2", 7)).await.unwrap();

    let sender = ScriptedSender::new(&["n-2"]);
    let outcome = notifications::dispatch_pending(&db, &cancel, &sender, 20)
        .await
        .unwrap();
    assert_eq!(outcome.claimed, 2);
    assert_eq!(outcome.sent, 1);
    assert_eq!(outcome.failed, 1);

    let (status, has_sent_at) = status_of(&db, "n-1").await;
    assert_eq!(status, "sent");
    assert!(has_sent_at);

    let (status, has_sent_at) = status_of(&db, "n-2").await;
    assert_eq!(status, "failed");
    assert!(!has_sent_at);
}

#[tokio::test]
async fn terminal_rows_are_never_redispatched() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    notifications::enqueue(&db, &cancel, &pending("n-1", 7)).await.unwrap();
    notifications::enqueue(&db, &cancel, &pending("n-2", 7)).await.unwrap();

    let sender = ScriptedSender::new(&["n-2"]);
    notifications::dispatch_pending(&db, &cancel, &sender, 20).await.unwrap();

    // A second cycle claims nothing: sent and failed are both terminal.
    let outcome = notifications::dispatch_pending(&db, &cancel, &sender, 20)
        .await
        .unwrap();
    assert_eq!(outcome.claimed, 0);
    assert_eq!(sender.delivered().await, vec!["n-1".to_string()]);
}

#[tokio::test]
async fn batch_size_bounds_the_claim_in_insertion_order() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    for i in 1..=5 {
        notifications::enqueue(&db, &cancel, &pending(&format!("n-{i}"), 7))
            .await
            .unwrap();
    }

    let sender = ScriptedSender::new(&[]);
    let outcome = notifications::dispatch_pending(&db, &cancel, &sender, 2)
        .await
        .unwrap();
    assert_eq!(outcome.claimed, 2);
    assert_eq!(outcome.sent, 2);
    assert_eq!(
        sender.delivered().await,
        vec!["n-1".to_string(), "n-2".to_string()],
        "claims follow (created_at, notification_id) order"
    );

    let outcome = notifications::dispatch_pending(&db, &cancel, &sender, 20)
        .await
        .unwrap();
    assert_eq!(outcome.claimed, 3);
}

#[tokio::test]
async fn cancellation_mid_batch_writes_no_status() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    notifications::enqueue(&db, &cancel, &pending("n-1", 7)).await.unwrap();

    let err = notifications::dispatch_pending(&db, &cancel, &CancellingSender, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, ShiftlensError::Cancelled));

    // The transaction rolled back: the row is still pending.
    let (status, has_sent_at) = status_of(&db, "n-1").await;
    assert_eq!(status, "pending");
    assert!(!has_sent_at);

    // The next cycle redelivers it (at-least-once).
    let sender = ScriptedSender::new(&[]);
    let outcome = notifications::dispatch_pending(&db, &cancel, &sender, 20)
        .await
        .unwrap();
    assert_eq!(outcome.sent, 1);
}

#[tokio::test]
async fn get_by_id_round_trips_payload_fields() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    let mut new = pending("n-payload", 9);
    new.event_ids = vec!["ev-1".to_string(), "ev-2".to_string()];
    new.schedule_date = Some(chrono::NaiveDate::from_ymd_opt(2026, 8, 2).unwrap());
    notifications::enqueue(&db, &cancel, &new).await.unwrap();

    let fetched = notifications::get_by_id(&db, &cancel, "n-payload")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.status, NotificationStatus::Pending);
    assert_eq!(fetched.user_id, 9);
    assert_eq!(fetched.event_ids, vec!["ev-1", "ev-2"]);
    assert_eq!(
        fetched.schedule_date,
        Some(chrono::NaiveDate::from_ymd_opt(2026, 8, 2).unwrap())
    );
    assert!(fetched.sent_at.is_none());
}

#[tokio::test]
async fn duplicate_notification_id_conflicts() {
    let _guard = common::lock().await;
    let Some(db) = common::test_db().await else { return };
    common::reset(&db).await;
    let cancel = common::cancel();

    notifications::enqueue(&db, &cancel, &pending("n-dup", 7)).await.unwrap();
    let err = notifications::enqueue(&db, &cancel, &pending("n-dup", 7))
        .await
        .unwrap_err();
    assert!(matches!(err, ShiftlensError::UniquenessConflict { .. }));
}
