//! # Location Repository
//!
//! Counting sites. Read-only on the device: rows arrive through the pull
//! ([`SyncRepository::upsert_pulled`](crate::SyncRepository::upsert_pulled))
//! or the seed tool.

use sqlx::SqlitePool;

use crate::error::DbResult;
use stockcount_core::Location;

const LOCATION_COLUMNS: &str =
    "id, company_id, name, location_type, active, created_at, updated_at";

/// Repository for location lookups.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Active locations by name.
    pub async fn list_active(&self) -> DbResult<Vec<Location>> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE active = 1 ORDER BY name COLLATE NOCASE"
        );
        let locations = sqlx::query_as::<_, Location>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(locations)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1");
        let location = sqlx::query_as::<_, Location>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    /// Inserts or replaces a location by id.
    pub async fn upsert(&self, location: &Location) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_location(&mut conn, location).await
    }
}

/// Shared by [`LocationRepository::upsert`] and the pull transaction.
pub(crate) async fn upsert_location(
    conn: &mut sqlx::SqliteConnection,
    location: &Location,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO locations (id, company_id, name, location_type, active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (id) DO UPDATE SET
            company_id = excluded.company_id,
            name = excluded.name,
            location_type = excluded.location_type,
            active = excluded.active,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&location.id)
    .bind(&location.company_id)
    .bind(&location.name)
    .bind(location.location_type)
    .bind(location.active)
    .bind(location.created_at)
    .bind(location.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}
