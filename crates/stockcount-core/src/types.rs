//! # Domain Types
//!
//! Core domain types used throughout StockCount.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  REFERENCE DATA (server wins)          SESSION DATA                     │
//! │  ┌─────────────────┐                   ┌─────────────────┐              │
//! │  │    Product      │                   │  CountSession   │              │
//! │  │  id, barcode    │                   │  id, location   │              │
//! │  │  name, unit     │                   │  open → closed  │              │
//! │  └─────────────────┘                   └────────┬────────┘              │
//! │  ┌─────────────────┐                            │ 1..n                  │
//! │  │    Location     │                   ┌────────▼────────┐              │
//! │  │  store/warehouse│                   │ InventoryEvent  │ append-only  │
//! │  └─────────────────┘                   │ qty_delta (+/-) │              │
//! │                                        └─────────────────┘              │
//! │                                                                         │
//! │  LOCAL-ONLY: SyncMeta { sync_status, sync_attempts, last_sync_error }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity id is a client-generated UUID v4. For events the id is also
//! the idempotency key the backend uses to drop duplicate submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// =============================================================================
// Enumerations
// =============================================================================

/// Role of the signed-in operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Operator,
}

/// Lifecycle of a count session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Open,
    Closed,
}

/// Kind of inventory event.
///
/// The type is descriptive only: aggregation always sums `qty_delta`
/// regardless of type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// One unit scanned for a known product.
    ScanAdd,
    /// Operator typed an absolute count; the delta is derived from it.
    CountSet,
    /// Manual +/- correction, including undo compensation.
    Adjust,
    /// Scan of a barcode with no matching product at scan time.
    PendingUnknown,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::ScanAdd => write!(f, "SCAN_ADD"),
            EventType::CountSet => write!(f, "COUNT_SET"),
            EventType::Adjust => write!(f, "ADJUST"),
            EventType::PendingUnknown => write!(f, "PENDING_UNKNOWN"),
        }
    }
}

/// Local-only sync state of a row. Never sent to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    /// Pending and failed rows are both picked up by the next push.
    #[inline]
    pub fn needs_push(&self) -> bool {
        !matches!(self, SyncStatus::Synced)
    }
}

/// Kind of counting site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    #[default]
    Store,
    Warehouse,
    Other,
}

// =============================================================================
// Product
// =============================================================================

/// A countable SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,

    pub company_id: String,

    /// Optional stock keeping unit code.
    #[serde(default)]
    pub sku: Option<String>,

    pub name: String,

    /// Unique within a company, not across companies.
    #[serde(default)]
    pub barcode: Option<String>,

    /// Unit label shown next to quantities ("un", "kg", "box").
    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(default)]
    pub price: f64,

    /// Soft-delete flag. Synced products are never hard-deleted.
    #[serde(default = "default_true")]
    pub active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

fn default_unit() -> String {
    crate::DEFAULT_UNIT.to_string()
}

fn default_true() -> bool {
    true
}

/// Input for creating or editing a product from the counting screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    pub name: String,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub unit: Option<String>,
    pub price: Option<f64>,
}

impl Product {
    /// Builds a new active product owned by `company_id`.
    pub fn from_draft(draft: ProductDraft, company_id: &str) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            sku: non_empty(draft.sku),
            name: draft.name.trim().to_string(),
            barcode: non_empty(draft.barcode),
            unit: non_empty(draft.unit).unwrap_or_else(default_unit),
            price: draft.price.unwrap_or(0.0),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an edit, keeping id, owner and creation time.
    pub fn apply_draft(&mut self, draft: ProductDraft) {
        self.name = draft.name.trim().to_string();
        self.barcode = non_empty(draft.barcode);
        self.sku = non_empty(draft.sku);
        self.unit = non_empty(draft.unit).unwrap_or_else(default_unit);
        self.price = draft.price.unwrap_or(0.0);
        self.updated_at = Utc::now();
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Location
// =============================================================================

/// A physical counting site. Read-only on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub location_type: LocationType,
    #[serde(default = "default_true")]
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Count Session
// =============================================================================

/// One counting exercise at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CountSession {
    pub id: String,
    pub location_id: String,
    pub title: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CountSession {
    /// Opens a new session at `location_id`.
    pub fn open(
        location_id: &str,
        title: &str,
        notes: Option<String>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        CountSession {
            id: Uuid::new_v4().to_string(),
            location_id: location_id.to_string(),
            title: title.trim().to_string(),
            status: SessionStatus::Open,
            notes: non_empty(notes),
            created_by,
            created_at: now,
            closed_at: None,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// A session row together with its local sync state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LocalSession {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub session: CountSession,

    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sync: SyncMeta,
}

// =============================================================================
// Inventory Event
// =============================================================================

/// Who produced an event: the device and the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventOrigin {
    pub device_id: String,
    pub user_id: String,
}

/// The append-only unit of truth.
///
/// `qty_delta` is the only value aggregation sums. `qty_absolute` records the
/// target a `COUNT_SET` was derived from and must never be summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryEvent {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    /// Present when the product was unresolved at scan time.
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub qty_delta: i64,
    #[serde(default)]
    pub qty_absolute: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
    pub device_id: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub client_time: DateTime<Utc>,
    /// Set only by the remote.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub server_received_at: Option<DateTime<Utc>>,
}

impl InventoryEvent {
    /// Creates a new event with a fresh id and the current client time.
    pub fn new(session_id: &str, event_type: EventType, qty_delta: i64, origin: &EventOrigin) -> Self {
        InventoryEvent {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            product_id: None,
            barcode: None,
            event_type,
            qty_delta,
            qty_absolute: None,
            reason: None,
            device_id: origin.device_id.clone(),
            user_id: origin.user_id.clone(),
            client_time: Utc::now(),
            server_received_at: None,
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_absolute(mut self, qty_absolute: i64) -> Self {
        self.qty_absolute = Some(qty_absolute);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Aggregation key: the product id when known, else the raw barcode.
    pub fn item_key(&self) -> Option<&str> {
        self.product_id
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| self.barcode.as_deref().filter(|k| !k.is_empty()))
    }

    /// Builds the event that cancels this one's effect.
    ///
    /// Same session and item identity, negated delta, recorded as `ADJUST`.
    pub fn compensate(&self, origin: &EventOrigin) -> InventoryEvent {
        let mut undo = InventoryEvent::new(&self.session_id, EventType::Adjust, -self.qty_delta, origin)
            .with_reason(format!("{} {}", crate::UNDO_REASON, self.id));
        undo.product_id = self.product_id.clone();
        undo.barcode = self.barcode.clone();
        undo
    }
}

/// An event row together with its local sync state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LocalEvent {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub event: InventoryEvent,

    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sync: SyncMeta,
}

/// Device-local sync bookkeeping attached to synced entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SyncMeta {
    pub sync_status: SyncStatus,
    /// Diagnostic only; failed rows are retried forever.
    pub sync_attempts: i64,
    pub last_sync_error: Option<String>,
}

// =============================================================================
// Authentication
// =============================================================================

/// The signed-in user as stored on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LocalAuth {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub company_id: String,
    /// Argon2 PHC string; the PIN itself is never stored.
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub pin_hash: Option<String>,
    #[ts(as = "String")]
    pub last_login_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> EventOrigin {
        EventOrigin {
            device_id: "device-1".into(),
            user_id: "user-1".into(),
        }
    }

    #[test]
    fn test_item_key_prefers_product_id() {
        let event = InventoryEvent::new("s1", EventType::ScanAdd, 1, &origin())
            .with_product("p1")
            .with_barcode("789");
        assert_eq!(event.item_key(), Some("p1"));

        let unknown = InventoryEvent::new("s1", EventType::PendingUnknown, 1, &origin())
            .with_barcode("789");
        assert_eq!(unknown.item_key(), Some("789"));

        let empty = InventoryEvent::new("s1", EventType::Adjust, 1, &origin());
        assert_eq!(empty.item_key(), None);
    }

    #[test]
    fn test_blank_product_id_falls_back_to_barcode() {
        let event = InventoryEvent::new("s1", EventType::PendingUnknown, 1, &origin())
            .with_product("")
            .with_barcode("789");
        assert_eq!(event.item_key(), Some("789"));
        assert!(crate::validation::validate_event(&event).is_ok());
    }

    #[test]
    fn test_compensate_negates_delta_and_keeps_identity() {
        let event = InventoryEvent::new("s1", EventType::CountSet, 7, &origin())
            .with_product("p1")
            .with_barcode("789")
            .with_absolute(12);
        let undo = event.compensate(&origin());

        assert_ne!(undo.id, event.id);
        assert_eq!(undo.qty_delta, -7);
        assert_eq!(undo.event_type, EventType::Adjust);
        assert_eq!(undo.product_id.as_deref(), Some("p1"));
        assert_eq!(undo.barcode.as_deref(), Some("789"));
        assert_eq!(undo.qty_absolute, None);
        assert!(undo.reason.unwrap().contains(&event.id));
    }

    #[test]
    fn test_event_wire_format() {
        let event = InventoryEvent::new("s1", EventType::ScanAdd, 1, &origin()).with_barcode("789");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SCAN_ADD");
        assert_eq!(json["qty_delta"], 1);
        assert!(json.get("sync_status").is_none());
    }

    #[test]
    fn test_product_from_draft_normalizes_blanks() {
        let product = Product::from_draft(
            ProductDraft {
                name: "  Coffee 500g ".into(),
                barcode: Some("  ".into()),
                sku: None,
                unit: None,
                price: None,
            },
            "company-1",
        );
        assert_eq!(product.name, "Coffee 500g");
        assert_eq!(product.barcode, None);
        assert_eq!(product.unit, "un");
        assert!(product.active);
    }

    #[test]
    fn test_sync_status_needs_push() {
        assert!(SyncStatus::Pending.needs_push());
        assert!(SyncStatus::Failed.needs_push());
        assert!(!SyncStatus::Synced.needs_push());
    }
}
