//! # stockcount-core: Pure Domain Logic for StockCount
//!
//! Domain types, validation and the event aggregator for the offline
//! inventory counting engine. Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     StockCount Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    Counting UI (external)                       │    │
//! │  │    Scanner input ──► Count list ──► Sessions ──► Reports        │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │        stockcount-sync (CountingService, SyncEngine)            │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ stockcount-core (THIS CRATE) ★                  │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────┐  ┌────────────┐  ┌──────────┐  ┌────────────┐   │    │
//! │  │   │   types   │  │ aggregator │  │  report  │  │ validation │   │    │
//! │  │   │  Product  │  │   fold     │  │  sorted  │  │   rules    │   │    │
//! │  │   │   Event   │  │  tally     │  │  lines   │  │   checks   │   │    │
//! │  │   └───────────┘  └────────────┘  └──────────┘  └────────────┘   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │              stockcount-db (SQLite event store)                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CountSession, InventoryEvent, etc.)
//! - [`aggregator`] - Fold of a session's events into per-item counts
//! - [`report`] - Sorted read-side view of a tally
//! - [`error`] - Domain error types
//! - [`validation`] - Input and event shape rules
//!
//! ## Example Usage
//!
//! ```rust
//! use stockcount_core::aggregator::{aggregate, NoProducts};
//! use stockcount_core::types::{EventOrigin, EventType, InventoryEvent};
//!
//! let origin = EventOrigin { device_id: "d1".into(), user_id: "u1".into() };
//! let events = vec![
//!     InventoryEvent::new("s1", EventType::PendingUnknown, 1, &origin).with_barcode("789"),
//!     InventoryEvent::new("s1", EventType::PendingUnknown, 1, &origin).with_barcode("789"),
//! ];
//!
//! let tally = aggregate(&events, &NoProducts);
//! assert_eq!(tally.quantity_of("789"), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod error;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregator::{aggregate, CountedItem, ProductCatalog, ProductResolver, SessionTally};
pub use error::{CoreError, CoreResult, ValidationError};
pub use report::SessionReport;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Company used when the signed-in profile carries none.
pub const DEFAULT_COMPANY_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Unit label for products created without one.
pub const DEFAULT_UNIT: &str = "un";

/// Reason prefix written on compensating events.
pub const UNDO_REASON: &str = "undo";
