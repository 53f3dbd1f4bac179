//! # Event Repository
//!
//! The append-only inventory event log.
//!
//! ## Append
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. SELECT status FROM sessions WHERE id = ?                            │
//! │     ├── no row   → ValidationError::UnknownSession                      │
//! │     └── 'closed' → ValidationError::SessionClosed                       │
//! │                                                                         │
//! │  2. INSERT INTO events (..., sync_status = 'pending', attempts = 0)     │
//! │     seq = AUTOINCREMENT  ← defines the order the aggregator folds in    │
//! │                                                                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never deleted and their payload columns never change; triggers
//! in the schema reject both. Only `sync_status`, `sync_attempts` and
//! `last_sync_error` are written after the insert, and only by the sync
//! engine.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stockcount_core::validation::validate_event;
use stockcount_core::{InventoryEvent, LocalEvent, SessionStatus, SyncMeta, ValidationError};

const EVENT_COLUMNS: &str = r#"
    id, session_id, product_id, barcode, event_type, qty_delta, qty_absolute,
    reason, device_id, user_id, client_time, server_received_at,
    sync_status, sync_attempts, last_sync_error
"#;

/// Repository for the inventory event log.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    /// Appends one event as `pending`.
    ///
    /// ## Errors
    /// - `DbError::Validation` if the event has no product id and no
    ///   barcode, or its session is unknown or closed. Nothing is written.
    pub async fn append(&self, event: &InventoryEvent) -> DbResult<LocalEvent> {
        validate_event(event)?;

        let mut tx = self.pool.begin().await?;

        let status: Option<SessionStatus> =
            sqlx::query_scalar("SELECT status FROM sessions WHERE id = ?1")
                .bind(&event.session_id)
                .fetch_optional(&mut *tx)
                .await?;

        match status {
            None => {
                return Err(ValidationError::UnknownSession {
                    session_id: event.session_id.clone(),
                }
                .into())
            }
            Some(SessionStatus::Closed) => {
                return Err(ValidationError::SessionClosed {
                    session_id: event.session_id.clone(),
                }
                .into())
            }
            Some(SessionStatus::Open) => {}
        }

        sqlx::query(
            r#"
            INSERT INTO events (
                id, session_id, product_id, barcode, event_type, qty_delta,
                qty_absolute, reason, device_id, user_id, client_time,
                server_received_at, sync_status, sync_attempts, last_sync_error
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, 'pending', 0, NULL
            )
            "#,
        )
        .bind(&event.id)
        .bind(&event.session_id)
        .bind(&event.product_id)
        .bind(&event.barcode)
        .bind(event.event_type)
        .bind(event.qty_delta)
        .bind(event.qty_absolute)
        .bind(&event.reason)
        .bind(&event.device_id)
        .bind(&event.user_id)
        .bind(event.client_time)
        .bind(event.server_received_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            event_id = %event.id,
            session_id = %event.session_id,
            event_type = %event.event_type,
            qty_delta = event.qty_delta,
            "Event appended"
        );

        Ok(LocalEvent {
            event: event.clone(),
            sync: SyncMeta::default(),
        })
    }

    /// All events of a session in append order.
    pub async fn events_for_session(&self, session_id: &str) -> DbResult<Vec<LocalEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE session_id = ?1 ORDER BY seq ASC"
        );
        let events = sqlx::query_as::<_, LocalEvent>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Looks up a single event by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<LocalEvent>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
        let event = sqlx::query_as::<_, LocalEvent>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Events still to be pushed (`pending` or `failed`), oldest first.
    ///
    /// The result is a snapshot: events appended after this call go out in
    /// the next cycle.
    pub async fn pending_events(&self) -> DbResult<Vec<LocalEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE sync_status IN ('pending', 'failed') ORDER BY seq ASC"
        );
        let events = sqlx::query_as::<_, LocalEvent>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Number of events still to be pushed, for the status badge.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM events WHERE sync_status IN ('pending', 'failed')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks one event as acknowledged by the backend.
    pub async fn mark_synced(&self, id: &str) -> DbResult<()> {
        self.apply_push_results(&[id.to_string()], &[], "").await
    }

    /// Records a push failure on one event and bumps its attempt counter.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        self.apply_push_results(&[], &[id.to_string()], error).await
    }

    /// Writes the outcome of a push phase in one transaction.
    ///
    /// `synced_ids` become `synced` with attempts reset; `failed_ids` become
    /// `failed` with `error` recorded and attempts incremented.
    pub async fn apply_push_results(
        &self,
        synced_ids: &[String],
        failed_ids: &[String],
        error: &str,
    ) -> DbResult<()> {
        if synced_ids.is_empty() && failed_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for id in synced_ids {
            sqlx::query(
                r#"
                UPDATE events SET
                    sync_status = 'synced',
                    sync_attempts = 0,
                    last_sync_error = NULL
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        for id in failed_ids {
            sqlx::query(
                r#"
                UPDATE events SET
                    sync_status = 'failed',
                    sync_attempts = sync_attempts + 1,
                    last_sync_error = ?2
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(error)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            synced = synced_ids.len(),
            failed = failed_ids.len(),
            "Push results recorded"
        );

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
