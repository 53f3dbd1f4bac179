//! # Auth Repository
//!
//! The single `local_auth` row holding the signed-in user, so the device
//! can be unlocked offline with a PIN.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use stockcount_core::LocalAuth;

/// Repository for the locally stored user.
#[derive(Debug, Clone)]
pub struct AuthRepository {
    pool: SqlitePool,
}

impl AuthRepository {
    /// Creates a new AuthRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuthRepository { pool }
    }

    pub async fn get(&self) -> DbResult<Option<LocalAuth>> {
        let auth = sqlx::query_as::<_, LocalAuth>(
            r#"
            SELECT user_id, email, name, role, company_id, pin_hash, last_login_at
            FROM local_auth WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(auth)
    }

    /// Stores the signed-in user, replacing any previous one.
    ///
    /// A stored PIN hash survives when the same user signs in again.
    pub async fn save(&self, auth: &LocalAuth) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO local_auth (id, user_id, email, name, role, company_id, pin_hash, last_login_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                role = excluded.role,
                company_id = excluded.company_id,
                pin_hash = CASE
                    WHEN local_auth.user_id = excluded.user_id
                    THEN COALESCE(excluded.pin_hash, local_auth.pin_hash)
                    ELSE excluded.pin_hash
                END,
                user_id = excluded.user_id,
                last_login_at = excluded.last_login_at
            "#,
        )
        .bind(&auth.user_id)
        .bind(&auth.email)
        .bind(&auth.name)
        .bind(auth.role)
        .bind(&auth.company_id)
        .bind(&auth.pin_hash)
        .bind(auth.last_login_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets the PIN hash of the stored user.
    pub async fn set_pin_hash(&self, pin_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE local_auth SET pin_hash = ?1 WHERE id = 1")
            .bind(pin_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("LocalAuth", "1"));
        }
        Ok(())
    }

    pub async fn touch_login(&self, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE local_auth SET last_login_at = ?1 WHERE id = 1")
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes the stored user. Events and sessions are kept.
    pub async fn clear(&self) -> DbResult<()> {
        sqlx::query("DELETE FROM local_auth WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{Database, DbConfig};
    use stockcount_core::{LocalAuth, UserRole};

    fn auth(user_id: &str) -> LocalAuth {
        LocalAuth {
            user_id: user_id.into(),
            email: format!("{user_id}@example.com"),
            name: "Ana".into(),
            role: UserRole::Operator,
            company_id: "c".into(),
            pin_hash: None,
            last_login_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_keeps_pin_for_same_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.auth();

        assert!(repo.set_pin_hash("hash").await.is_err());

        repo.save(&auth("u1")).await.unwrap();
        repo.set_pin_hash("hash").await.unwrap();
        repo.save(&auth("u1")).await.unwrap();
        assert_eq!(repo.get().await.unwrap().unwrap().pin_hash.as_deref(), Some("hash"));

        repo.save(&auth("u2")).await.unwrap();
        let stored = repo.get().await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u2");
        assert_eq!(stored.pin_hash, None);

        repo.clear().await.unwrap();
        assert!(repo.get().await.unwrap().is_none());
    }
}
