//! # Validation Module
//!
//! Input validation for counting commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CountingService (stockcount-sync)                             │
//! │  └── THIS MODULE: barcode, names, deltas, event shape                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: EventRepository::append (stockcount-db)                       │
//! │  ├── event shape re-checked                                             │
//! │  └── session exists and is open (same transaction as the insert)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  └── UNIQUE (company_id, barcode)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockcount_core::validation::{normalize_barcode, validate_adjust_delta};
//!
//! assert_eq!(normalize_barcode("  7891234 ").unwrap(), "7891234");
//! assert!(validate_adjust_delta(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{EventType, InventoryEvent, ProductDraft};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_BARCODE_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;
const MAX_TITLE_LEN: usize = 120;

// =============================================================================
// String Validators
// =============================================================================

/// Trims scanner input and checks it is a usable barcode.
///
/// Keyboard-wedge scanners append CR/LF and sometimes pad with spaces, so
/// the input is trimmed first. Returns the normalized barcode.
pub fn normalize_barcode(raw: &str) -> ValidationResult<String> {
    let barcode = raw.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if barcode.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(barcode.to_string())
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use stockcount_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Coffee 500g").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a product draft before create or update.
pub fn validate_product_draft(draft: &ProductDraft) -> ValidationResult<()> {
    validate_product_name(&draft.name)?;

    if let Some(barcode) = draft.barcode.as_deref().filter(|b| !b.trim().is_empty()) {
        normalize_barcode(barcode)?;
    }

    if let Some(price) = draft.price {
        if !price.is_finite() || price < 0.0 {
            return Err(ValidationError::Negative {
                field: "price".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a count session title.
pub fn validate_session_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }

    if title.len() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: MAX_TITLE_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// A manual adjustment of zero would be a no-op event.
pub fn validate_adjust_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "qty_delta".to_string(),
        });
    }
    Ok(())
}

/// The operator cannot count fewer than zero units.
pub fn validate_count_target(target: i64) -> ValidationResult<()> {
    if target < 0 {
        return Err(ValidationError::Negative {
            field: "qty_absolute".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Event Shape
// =============================================================================

/// Checks the structural rules every appended event must satisfy.
///
/// ## Rules
/// - product id or barcode present (the aggregation key)
/// - `qty_absolute` only on `COUNT_SET`, and there it is required
pub fn validate_event(event: &InventoryEvent) -> ValidationResult<()> {
    if event.item_key().is_none() {
        return Err(ValidationError::MissingItemIdentity);
    }

    if event.session_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "session_id".to_string(),
        });
    }

    match (event.event_type, event.qty_absolute) {
        (EventType::CountSet, None) => Err(ValidationError::Required {
            field: "qty_absolute".to_string(),
        }),
        (EventType::CountSet, Some(target)) => validate_count_target(target),
        (_, Some(_)) => Err(ValidationError::InvalidFormat {
            field: "qty_absolute".to_string(),
            reason: "only COUNT_SET events carry an absolute quantity".to_string(),
        }),
        (_, None) => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
