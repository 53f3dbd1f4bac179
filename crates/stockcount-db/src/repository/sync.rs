//! # Sync Repository
//!
//! Applies pulled reference data and advances the pull cursor.
//!
//! ## Pull Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pull(device_id, since = last_sync_at) → { products, sessions,          │
//! │                                            locations, server_time }     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   SINGLE TRANSACTION                            │    │
//! │  │                                                                 │    │
//! │  │  1. UPSERT products   by id  → sync_status = 'synced'           │    │
//! │  │  2. UPSERT locations  by id                                     │    │
//! │  │  3. UPSERT sessions   by id  → sync_status = 'synced'           │    │
//! │  │     (a locally closed session stays closed)                     │    │
//! │  │  4. UPDATE device_state SET last_sync_at = server_time          │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← data and cursor move together                                 │
//! │                                                                         │
//! │  A crash before COMMIT leaves the old cursor: the next cycle pulls      │
//! │  the same window again and the upserts are idempotent.                  │
//! │  Events are never touched by a pull.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::location::upsert_location;
use stockcount_core::{CountSession, Location, Product};

/// Row counts written by one pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub products: usize,
    pub sessions: usize,
    pub locations: usize,
}

/// Repository for applying pulled changes.
#[derive(Debug, Clone)]
pub struct SyncRepository {
    pool: SqlitePool,
}

impl SyncRepository {
    /// Creates a new SyncRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncRepository { pool }
    }

    /// Upserts pulled rows and moves the cursor to `server_time`, atomically.
    ///
    /// Pulled values win over local ones, with one exception: the backend
    /// never reopens a session this device closed. Such a row keeps its
    /// local sync status so the close is still pushed.
    pub async fn upsert_pulled(
        &self,
        products: &[Product],
        sessions: &[CountSession],
        locations: &[Location],
        server_time: DateTime<Utc>,
    ) -> DbResult<PullSummary> {
        let mut tx = self.pool.begin().await?;

        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, company_id, sku, name, barcode, unit, price, active,
                    created_at, updated_at,
                    sync_status, sync_attempts, last_sync_error
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                    ?9, ?10,
                    'synced', 0, NULL
                )
                ON CONFLICT (id) DO UPDATE SET
                    company_id = excluded.company_id,
                    sku = excluded.sku,
                    name = excluded.name,
                    barcode = excluded.barcode,
                    unit = excluded.unit,
                    price = excluded.price,
                    active = excluded.active,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    sync_status = 'synced',
                    sync_attempts = 0,
                    last_sync_error = NULL
                "#,
            )
            .bind(&product.id)
            .bind(&product.company_id)
            .bind(&product.sku)
            .bind(&product.name)
            .bind(&product.barcode)
            .bind(&product.unit)
            .bind(product.price)
            .bind(product.active)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for location in locations {
            upsert_location(&mut *tx, location).await?;
        }

        for session in sessions {
            sqlx::query(
                r#"
                INSERT INTO sessions (
                    id, location_id, title, status, notes, created_by,
                    created_at, closed_at, updated_at,
                    sync_status, sync_attempts, last_sync_error
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    ?7, ?8, ?9,
                    'synced', 0, NULL
                )
                ON CONFLICT (id) DO UPDATE SET
                    location_id = excluded.location_id,
                    title = excluded.title,
                    notes = excluded.notes,
                    created_by = excluded.created_by,
                    status = CASE
                        WHEN sessions.status = 'closed' THEN 'closed'
                        ELSE excluded.status
                    END,
                    closed_at = COALESCE(sessions.closed_at, excluded.closed_at),
                    updated_at = CASE
                        WHEN sessions.status = 'closed' AND excluded.status = 'open'
                        THEN sessions.updated_at
                        ELSE excluded.updated_at
                    END,
                    sync_status = CASE
                        WHEN sessions.status = 'closed' AND excluded.status = 'open'
                        THEN sessions.sync_status
                        ELSE 'synced'
                    END,
                    sync_attempts = CASE
                        WHEN sessions.status = 'closed' AND excluded.status = 'open'
                        THEN sessions.sync_attempts
                        ELSE 0
                    END,
                    last_sync_error = CASE
                        WHEN sessions.status = 'closed' AND excluded.status = 'open'
                        THEN sessions.last_sync_error
                        ELSE NULL
                    END
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
            .execute(&mut *tx)
            .await?;
        }

        // The cursor row may not exist yet if the device id was never read.
        sqlx::query(
            r#"
            INSERT INTO device_state (id, device_id, last_sync_at, created_at)
            VALUES (1, ?1, ?2, ?2)
            ON CONFLICT (id) DO UPDATE SET last_sync_at = excluded.last_sync_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(server_time)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let summary = PullSummary {
            products: products.len(),
            sessions: sessions.len(),
            locations: locations.len(),
        };

        debug!(
            products = summary.products,
            sessions = summary.sessions,
            locations = summary.locations,
            server_time = %server_time,
            "Pulled changes applied"
        );

        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::{Database, DbConfig};
    use stockcount_core::{
        CountSession, EventOrigin, EventType, InventoryEvent, Location, LocationType, Product,
        ProductDraft, SessionStatus, SyncStatus,
    };

    fn location() -> Location {
        Location {
            id: "loc-1".into(),
            company_id: "c".into(),
            name: "Main".into(),
            location_type: LocationType::Store,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_pull_upserts_and_advances_cursor() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let device_id = db.device().device_id().await.unwrap();

        let mut local = Product::from_draft(
            ProductDraft {
                name: "Local name".into(),
                ..Default::default()
            },
            "c",
        );
        db.products().insert(&local).await.unwrap();

        local.name = "Server name".into();
        let remote_session = CountSession::open("loc-1", "Remote", None, None);
        let server_time = Utc::now();

        let summary = db
            .sync_state()
            .upsert_pulled(&[local.clone()], &[remote_session.clone()], &[location()], server_time)
            .await
            .unwrap();
        assert_eq!(summary.products, 1);
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.locations, 1);

        let stored = db.products().get_by_id(&local.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Server name");
        assert!(db.products().pending_products().await.unwrap().is_empty());

        let session = db.sessions().get_by_id(&remote_session.id).await.unwrap().unwrap();
        assert_eq!(session.sync.sync_status, SyncStatus::Synced);

        assert_eq!(db.device().last_sync_at().await.unwrap(), Some(server_time));
        assert_eq!(db.device().device_id().await.unwrap(), device_id);
        assert_eq!(db.locations().list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pull_never_reopens_a_closed_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = CountSession::open("loc-1", "Shelf", None, None);
        db.sessions().create(&session).await.unwrap();
        db.sessions().close(&session.id).await.unwrap();

        // Server still has it open (the close has not been pushed yet).
        let mut remote = session.clone();
        remote.updated_at = Utc::now() + Duration::seconds(1);
        db.sync_state()
            .upsert_pulled(&[], &[remote], &[], Utc::now())
            .await
            .unwrap();

        let stored = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.session.status, SessionStatus::Closed);
        assert!(stored.session.closed_at.is_some());
        assert_eq!(stored.sync.sync_status, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn test_pull_leaves_events_untouched() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = CountSession::open("loc-1", "Shelf", None, None);
        db.sessions().create(&session).await.unwrap();
        let origin = EventOrigin {
            device_id: "d".into(),
            user_id: "u".into(),
        };
        let event = InventoryEvent::new(&session.id, EventType::ScanAdd, 1, &origin).with_barcode("1");
        db.events().append(&event).await.unwrap();

        db.sync_state()
            .upsert_pulled(&[], &[session.clone()], &[], Utc::now())
            .await
            .unwrap();

        let events = db.events().events_for_session(&session.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sync.sync_status, SyncStatus::Pending);
    }
}
