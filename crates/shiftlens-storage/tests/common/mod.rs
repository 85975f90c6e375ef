// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared support for Postgres-backed integration tests.
//!
//! Tests are skipped (with a log line) when `DATABASE_URL` is not set, and
//! serialized through a global lock because they all truncate the same
//! schema.

use once_cell::sync::Lazy;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use shiftlens_storage::Database;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialize access to the shared test database.
pub async fn lock() -> MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

/// Connect to the test database named by `DATABASE_URL`, or `None` to skip.
pub async fn test_db() -> Option<Database> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };
    Some(
        Database::connect(&url, 5)
            .await
            .expect("failed to connect to test database"),
    )
}

/// Empty every table in the capture schema.
pub async fn reset(db: &Database) {
    for table in [
        "day_schedule_version",
        "schedule_notification",
        "capture_image",
        "capture_session",
    ] {
        sqlx::query(&format!("TRUNCATE capture.{table} CASCADE"))
            .execute(db.pool())
            .await
            .expect("failed to truncate test table");
    }
}

/// A fresh, uncancelled token.
pub fn cancel() -> CancellationToken {
    CancellationToken::new()
}
