//! # Sync Error Types
//!
//! Error types for sync, identity and counting commands.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │  InvalidConfig  │  │  Transport      │  │  DeserializationFailed  │  │
//! │  │  InvalidUrl     │  │  Timeout        │  │                         │  │
//! │  │  ConfigLoad/Save│  │  Http{status}   │  │                         │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │    Database     │  │     Domain      │  │      Auth / Internal    │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │  DatabaseError  │  │  CoreError      │  │  NotAuthenticated       │  │
//! │  │                 │  │  (validation,   │  │  InvalidPin, PinNotSet  │  │
//! │  │                 │  │   not found)    │  │  ShuttingDown           │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! │                                                                         │
//! │  Transport errors are recorded on the rows they affected and retried    │
//! │  on the next cycle. Nothing here is fatal to the scheduler.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use stockcount_core::{CoreError, ValidationError};
use stockcount_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid backend URL.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Network failure talking to the backend.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timeout.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to decode a backend response.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Local store failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A command was rejected by a domain rule.
    #[error(transparent)]
    Domain(#[from] CoreError),

    // =========================================================================
    // Auth Errors
    // =========================================================================
    /// No user is signed in on this device.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// PIN did not match the stored hash.
    #[error("Invalid PIN")]
    InvalidPin,

    /// Offline unlock requested but no PIN was ever set.
    #[error("No PIN set for offline unlock")]
    PinNotSet,

    /// Hashing the PIN failed.
    #[error("PIN hashing failed: {0}")]
    PinHash(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The scheduler task has stopped and no longer takes requests.
    #[error("Sync scheduler is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(v) => SyncError::Domain(CoreError::Validation(v)),
            other => SyncError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Domain(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::DeserializationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(0)
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the next sync cycle may succeed where this one failed.
    ///
    /// ## Retryable Errors
    /// Everything that went wrong between the device and the backend:
    /// network failures, timeouts, non-success HTTP statuses and
    /// undecodable responses. Rows affected by these are retried forever.
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Validation and other domain rule failures
    /// - Local authentication errors
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_)
                | SyncError::Timeout(_)
                | SyncError::Http { .. }
                | SyncError::DeserializationFailed(_)
        )
    }

    /// Returns true if the command was rejected by input validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Domain(CoreError::Validation(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Transport("connection refused".into()).is_retryable());
        assert!(SyncError::Timeout(30).is_retryable());
        assert!(SyncError::Http { status: 503, message: "unavailable".into() }.is_retryable());
        assert!(SyncError::Http { status: 401, message: "unauthorized".into() }.is_retryable());

        assert!(!SyncError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!SyncError::NotAuthenticated.is_retryable());
    }

    #[test]
    fn test_db_validation_maps_to_domain() {
        let err: SyncError = DbError::Validation(ValidationError::SessionClosed {
            session_id: "s1".into(),
        })
        .into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("s1"));

        let err: SyncError = DbError::not_found("Session", "s2").into();
        assert!(matches!(err, SyncError::DatabaseError(_)));
    }
}
