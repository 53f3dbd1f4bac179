//! # Sync Protocol Messages
//!
//! Request and response bodies exchanged with the backend.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Backend RPC Calls                                  │
//! │                                                                         │
//! │  PUSH (device → backend)                                                │
//! │  ───────────────────────                                                │
//! │  create_session   { session }              ──► { session_id }           │
//! │  close_session    { session_id, closed_at }──► { ok }                   │
//! │  upsert_products  { products }             ──► { accepted_ids }         │
//! │  push_events      { device_id, events }    ──► { accepted_ids,          │
//! │                                                  server_time }          │
//! │                                                                         │
//! │  PULL (backend → device)                                                │
//! │  ───────────────────────                                                │
//! │  pull             { device_id, since }     ──► { products, sessions,    │
//! │                                                  locations,             │
//! │                                                  server_time }          │
//! │                                                                         │
//! │  READ SIDE                                                              │
//! │  ─────────                                                              │
//! │  get_report       { session_id }           ──► { session_id, items }    │
//! │                                                                         │
//! │  Every write is idempotent on the backend: ids are client-generated     │
//! │  and re-sending an acknowledged row changes nothing.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! JSON bodies, snake_case fields, RFC 3339 timestamps. Local sync columns
//! (`sync_status`, `sync_attempts`, `last_sync_error`) never appear here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcount_core::{CountSession, InventoryEvent, Location, Product};

// =============================================================================
// Event Push
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEventsRequest {
    pub device_id: String,
    pub events: Vec<InventoryEvent>,
}

/// Ids the backend stored (or had already stored).
///
/// Any id of the request missing here was not accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushEventsResponse {
    #[serde(default)]
    pub accepted_ids: Vec<String>,
    pub server_time: DateTime<Utc>,
}

// =============================================================================
// Pull
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub device_id: String,
    /// Cursor from the previous pull. `None` pulls everything.
    pub since: Option<DateTime<Utc>>,
}

/// Reference data changed since the cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sessions: Vec<CountSession>,
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Next cursor.
    pub server_time: DateTime<Utc>,
}

impl PullResponse {
    pub fn empty(server_time: DateTime<Utc>) -> Self {
        PullResponse {
            products: Vec::new(),
            sessions: Vec::new(),
            locations: Vec::new(),
            server_time,
        }
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session: CountSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSessionRequest {
    pub session_id: String,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSessionResponse {
    #[serde(default = "default_ok")]
    pub ok: bool,
}

fn default_ok() -> bool {
    true
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProductsRequest {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertProductsResponse {
    #[serde(default)]
    pub accepted_ids: Vec<String>,
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetReportRequest {
    pub session_id: String,
}

/// Server-side totals of a session across every device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReport {
    pub session_id: String,
    #[serde(default)]
    pub items: Vec<RemoteReportItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReportItem {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcount_core::{EventOrigin, EventType};

    #[test]
    fn test_push_request_uses_wire_names() {
        let origin = EventOrigin {
            device_id: "d1".into(),
            user_id: "u1".into(),
        };
        let event = InventoryEvent::new("s1", EventType::ScanAdd, 1, &origin).with_barcode("789");
        let request = PushEventsRequest {
            device_id: "d1".into(),
            events: vec![event],
        };

        let json = serde_json::to_value(&request).unwrap();
        let wire = &json["events"][0];
        assert_eq!(wire["type"], "SCAN_ADD");
        assert_eq!(wire["qty_delta"], 1);
        assert!(wire.get("sync_status").is_none());
    }

    #[test]
    fn test_pull_response_tolerates_missing_lists() {
        let response: PullResponse =
            serde_json::from_str(r#"{ "server_time": "2024-05-01T10:00:00Z" }"#).unwrap();
        assert!(response.products.is_empty());
        assert!(response.sessions.is_empty());
        assert!(response.locations.is_empty());
    }
}
