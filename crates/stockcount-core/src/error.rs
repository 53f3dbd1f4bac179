//! # Error Types
//!
//! Domain-specific error types for stockcount-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockcount-core errors (this file)                                     │
//! │  ├── CoreError        - Domain rule failures                            │
//! │  └── ValidationError  - Input rejected before anything is persisted     │
//! │                                                                         │
//! │  stockcount-db errors                                                   │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  stockcount-sync errors                                                 │
//! │  └── SyncError        - Transport/protocol failures (retryable)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule failures raised by the command layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Rejected synchronously; a command that fails validation writes nothing.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be zero (e.g. an adjustment delta).
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Value must not be negative (e.g. a counted quantity).
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. invalid UUID, control characters in a barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// An event must identify its item by product id or barcode.
    #[error("event must carry a product_id or a barcode")]
    MissingItemIdentity,

    /// Append targeted a session that does not exist locally.
    #[error("session {session_id} does not exist")]
    UnknownSession { session_id: String },

    /// Append targeted a closed session.
    #[error("session {session_id} is closed")]
    SessionClosed { session_id: String },

    /// Duplicate value (e.g. barcode already used in the company).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SessionNotFound("s-1".to_string());
        assert_eq!(err.to_string(), "Session not found: s-1");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "barcode".to_string(),
        };
        assert_eq!(err.to_string(), "barcode is required");

        let err = ValidationError::MustBeNonZero {
            field: "qty_delta".to_string(),
        };
        assert_eq!(err.to_string(), "qty_delta must not be zero");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::MissingItemIdentity.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
