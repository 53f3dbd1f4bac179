//! # Database Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError (stockcount-core) ──► DbError::Validation              │
//! │  (closed/unknown session on append, event without item identity)       │
//! │                                                                         │
//! │  sqlx::Error                                                            │
//! │    "UNIQUE constraint failed"      ──► UniqueViolation (event id reused)│
//! │    "events are append-only"        ──► AppendOnly      (trigger fired)  │
//! │    "FOREIGN KEY constraint failed" ──► ForeignKeyViolation              │
//! │    PoolTimedOut / PoolClosed       ──► PoolExhausted / ConnectionFailed │
//! │                                                                         │
//! │  stockcount-sync folds everything except Validation into                │
//! │  SyncError::DatabaseError, surfaced as the cycle's last_error.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stockcount_core::ValidationError;
use thiserror::Error;

/// Local store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A row the caller named is missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input rejected before anything was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An event or entity id was stored twice.
    #[error("Duplicate key: {constraint}")]
    UniqueViolation { constraint: String },

    /// An event points at a session row that does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The append-only triggers rejected a delete or an edit of an event.
    #[error("Event log is append-only: {0}")]
    AppendOnly(String),

    /// Opening or creating the database file failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other SQLite error raised by a statement.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the caller supplied invalid input (nothing to retry).
    pub fn is_validation(&self) -> bool {
        matches!(self, DbError::Validation(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(constraint) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        constraint: constraint.to_string(),
                    }
                } else if msg.contains("append-only") {
                    DbError::AppendOnly(msg.to_string())
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Session", "s-1");
        assert_eq!(err.to_string(), "Session not found: s-1");
    }

    #[test]
    fn test_validation_is_transparent() {
        let err: DbError = ValidationError::SessionClosed {
            session_id: "s-1".into(),
        }
        .into();
        assert_eq!(err.to_string(), "session s-1 is closed");
        assert!(err.is_validation());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
