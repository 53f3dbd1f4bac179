//! # Device Repository
//!
//! The single `device_state` row: the device id and the pull cursor.
//!
//! The device id is generated the first time it is asked for and then
//! never changes for the lifetime of the database file.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;

/// Repository for device-local state.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: SqlitePool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeviceRepository { pool }
    }

    /// Returns the device id, generating and storing it on first use.
    pub async fn device_id(&self) -> DbResult<String> {
        let candidate = Uuid::new_v4().to_string();

        // Two callers racing on first use both end up with the stored row.
        let inserted = sqlx::query(
            r#"
            INSERT INTO device_state (id, device_id, last_sync_at, created_at)
            VALUES (1, ?1, NULL, ?2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&candidate)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!(device_id = %candidate, "Generated device id");
        }

        let device_id: String = sqlx::query_scalar("SELECT device_id FROM device_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(device_id)
    }

    /// Server time of the last successful pull, `None` before the first.
    pub async fn last_sync_at(&self) -> DbResult<Option<DateTime<Utc>>> {
        let cursor: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT last_sync_at FROM device_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(cursor.flatten())
    }
}
