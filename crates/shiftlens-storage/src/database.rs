// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection pool management, embedded migrations, and error translation.
//!
//! Every query module goes through [`Database`] and maps driver errors with
//! [`map_db_err`] so callers only ever see [`ShiftlensError`] kinds. The two
//! domain guards in the schema raise custom SQLSTATEs: `CS001` for an
//! illegal session transition and `CS002` for an image append on a session
//! that is missing or not open.

use std::future::Future;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use shiftlens_core::ShiftlensError;

/// SQLSTATE raised by the session transition validator trigger.
const SQLSTATE_ILLEGAL_TRANSITION: &str = "CS001";
/// SQLSTATE raised by the image-requires-open-session guard trigger.
const SQLSTATE_ILLEGAL_STATE: &str = "CS002";
/// Standard SQLSTATE for unique constraint violations.
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// Cloneable handle to the Postgres pool.
///
/// Migrations run once on connect; a `Database` that exists is a database
/// whose schema is current.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to Postgres and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, ShiftlensError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(map_db_err)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ShiftlensError::Internal(format!("migration failed: {e}")))?;

        info!(max_connections, "connected to capture store");
        Ok(Self { pool })
    }

    /// The underlying pool, for query modules and tests.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip check used at startup.
    pub async fn health_check(&self) -> Result<(), ShiftlensError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("capture store pool closed");
    }
}

/// Translate a driver error into the shared taxonomy.
///
/// Uniqueness violations carry the constraint name so callers can tell the
/// idempotent `object_key` conflict apart from an invariant breach.
pub(crate) fn map_db_err(e: sqlx::Error) -> ShiftlensError {
    match &e {
        sqlx::Error::RowNotFound => ShiftlensError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(SQLSTATE_UNIQUE_VIOLATION) => ShiftlensError::UniquenessConflict {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            Some(SQLSTATE_ILLEGAL_TRANSITION) => {
                ShiftlensError::IllegalTransition(db.message().to_string())
            }
            Some(SQLSTATE_ILLEGAL_STATE) => ShiftlensError::IllegalState(db.message().to_string()),
            _ => ShiftlensError::Internal(format!("database error: {db}")),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => ShiftlensError::Transient { source: Box::new(e) },
        _ => ShiftlensError::Internal(format!("database error: {e}")),
    }
}

/// Race a store round-trip against the ambient cancellation token.
///
/// Dropping the in-flight future releases its connection; an open
/// transaction rolls back when the connection returns to the pool, so a
/// cancelled write never leaves partial state behind.
pub(crate) async fn with_cancel<T, F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, ShiftlensError>
where
    F: Future<Output = Result<T, ShiftlensError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ShiftlensError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn with_cancel_passes_through_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let result = with_cancel(&cancel, async { Ok::<_, ShiftlensError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn with_cancel_short_circuits_on_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = with_cancel(&cancel, async {
            // Would hang forever without the token short-circuit.
            std::future::pending::<Result<(), ShiftlensError>>().await
        })
        .await;
        assert!(matches!(result, Err(ShiftlensError::Cancelled)));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = map_db_err(sqlx::Error::RowNotFound);
        assert!(matches!(err, ShiftlensError::NotFound(_)));
    }

    #[test]
    fn pool_timeout_maps_to_transient() {
        let err = map_db_err(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }
}
