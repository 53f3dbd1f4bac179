//! # Session Repository
//!
//! Count sessions and their local sync state.
//!
//! ```text
//!   create ──► open ──close()──► closed   (terminal)
//!                                   │
//!   close() again ──────────────────┘ no-op, returns the stored row
//! ```
//!
//! Creating and closing both mark the row `pending` so the next push
//! replays them on the backend. The backend treats both as idempotent.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockcount_core::{CountSession, LocalSession};

const SESSION_COLUMNS: &str = r#"
    id, location_id, title, status, notes, created_by,
    created_at, closed_at, updated_at,
    sync_status, sync_attempts, last_sync_error
"#;

/// Repository for count session operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Stores a new session as `pending`.
    pub async fn create(&self, session: &CountSession) -> DbResult<()> {
        debug!(session_id = %session.id, location_id = %session.location_id, "Creating session");

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, location_id, title, status, notes, created_by,
                created_at, closed_at, updated_at,
                sync_status, sync_attempts, last_sync_error
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                'pending', 0, NULL
            )
            "#,
        )
        .bind(&session.id)
        .bind(&session.location_id)
        .bind(&session.title)
        .bind(session.status)
        .bind(&session.notes)
        .bind(&session.created_by)
        .bind(session.created_at)
        .bind(session.closed_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<LocalSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let session = sqlx::query_as::<_, LocalSession>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// All sessions, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<LocalSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at DESC");
        let sessions = sqlx::query_as::<_, LocalSession>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Open sessions, newest first.
    pub async fn list_open(&self) -> DbResult<Vec<LocalSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE status = 'open' ORDER BY created_at DESC"
        );
        let sessions = sqlx::query_as::<_, LocalSession>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Closes a session. Closing an already closed session changes nothing.
    ///
    /// ## Returns
    /// The stored session after the call.
    ///
    /// ## Errors
    /// `DbError::NotFound` if the session does not exist.
    pub async fn close(&self, id: &str) -> DbResult<LocalSession> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = 'closed',
                closed_at = COALESCE(closed_at, ?2),
                updated_at = ?2,
                sync_status = 'pending'
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(session_id = %id, "Session closed");
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", id))
    }

    /// Sessions whose create or close still has to reach the backend.
    pub async fn pending_sessions(&self) -> DbResult<Vec<LocalSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE sync_status IN ('pending', 'failed') ORDER BY created_at ASC"
        );
        let sessions = sqlx::query_as::<_, LocalSession>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Marks a session as pushed.
    ///
    /// `pushed_version` is the `updated_at` the push was built from; if the
    /// row changed since (e.g. closed mid-push) it stays pending.
    pub async fn mark_synced(&self, id: &str, pushed_version: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                sync_status = 'synced',
                sync_attempts = 0,
                last_sync_error = NULL
            WHERE id = ?1 AND updated_at = ?2
            "#,
        )
        .bind(id)
        .bind(pushed_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a push failure on a session.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions SET
                sync_status = 'failed',
                sync_attempts = sync_attempts + 1,
                last_sync_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
