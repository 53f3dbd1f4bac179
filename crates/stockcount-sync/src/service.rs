//! # Counting Service
//!
//! Commands issued by the counting screen.
//!
//! Every command stamps the signed-in identity, writes through the local
//! store and never waits for the network. Writes leave rows `pending`; the
//! scheduler is nudged so the badge refreshes right away.
//!
//! ## Scan Flow
//! ```text
//! on_scan(session, "  789\r\n")
//!    │
//!    ├── normalize_barcode  ──► "789"   (empty → ValidationError)
//!    │
//!    ├── products.get_by_barcode(company, "789")
//!    │      ├── Some(p) ──► SCAN_ADD        +1  { product_id: p.id, barcode }
//!    │      └── None    ──► PENDING_UNKNOWN +1  { barcode }  → UI offers create
//!    │
//!    └── events.append  (unknown or closed session → ValidationError)
//! ```

use serde::Serialize;
use tracing::{debug, info};

use stockcount_core::validation::{
    normalize_barcode, validate_adjust_delta, validate_count_target, validate_product_draft,
    validate_session_title,
};
use stockcount_core::{
    aggregate, CoreError, CountSession, EventType, InventoryEvent, Location, LocalSession,
    Product, ProductCatalog, ProductDraft, SessionReport, SessionTally, ValidationError,
};
use stockcount_db::Database;

use crate::error::SyncResult;
use crate::identity::IdentityContext;
use crate::scheduler::SchedulerHandle;

/// Result of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub event: InventoryEvent,
    /// Product the barcode resolved to.
    pub product: Option<Product>,
    /// True when the barcode matched nothing; the UI should offer creation.
    pub unknown: bool,
}

/// Sync-aware command layer over the event store.
#[derive(Clone)]
pub struct CountingService {
    db: Database,
    identity: IdentityContext,
    scheduler: Option<SchedulerHandle>,
}

impl CountingService {
    pub fn new(db: Database, identity: IdentityContext) -> Self {
        CountingService {
            db,
            identity,
            scheduler: None,
        }
    }

    /// Attaches the scheduler to nudge after writes.
    pub fn with_scheduler(mut self, handle: SchedulerHandle) -> Self {
        self.scheduler = Some(handle);
        self
    }

    fn nudge(&self) {
        if let Some(handle) = &self.scheduler {
            handle.nudge();
        }
    }

    // =========================================================================
    // Counting
    // =========================================================================

    /// Records one scanned unit.
    pub async fn on_scan(&self, session_id: &str, raw_barcode: &str) -> SyncResult<ScanOutcome> {
        let stamp = self.identity.stamp()?;
        let barcode = normalize_barcode(raw_barcode)?;

        let product = self
            .db
            .products()
            .get_by_barcode(&stamp.company_id, &barcode)
            .await?;

        let event = match &product {
            Some(p) => InventoryEvent::new(session_id, EventType::ScanAdd, 1, &stamp.origin())
                .with_product(&p.id)
                .with_barcode(&barcode),
            None => InventoryEvent::new(session_id, EventType::PendingUnknown, 1, &stamp.origin())
                .with_barcode(&barcode),
        };

        self.db.events().append(&event).await?;
        self.nudge();

        let unknown = product.is_none();
        if unknown {
            info!(session_id = %session_id, barcode = %barcode, "Unknown barcode scanned");
        }

        Ok(ScanOutcome {
            event,
            product,
            unknown,
        })
    }

    /// Manual +/- correction on an item.
    ///
    /// `item_key` is a product id, or the barcode of an unknown item.
    pub async fn adjust(&self, session_id: &str, item_key: &str, delta: i64) -> SyncResult<InventoryEvent> {
        validate_adjust_delta(delta)?;
        let stamp = self.identity.stamp()?;

        let event = self
            .keyed(InventoryEvent::new(session_id, EventType::Adjust, delta, &stamp.origin()), item_key)
            .await?;

        self.db.events().append(&event).await?;
        self.nudge();
        Ok(event)
    }

    /// Sets an item's count to `target`.
    ///
    /// Appends `COUNT_SET` carrying the difference to the current total.
    /// Returns `None` when the item already has that count.
    pub async fn set_count(
        &self,
        session_id: &str,
        item_key: &str,
        target: i64,
    ) -> SyncResult<Option<InventoryEvent>> {
        validate_count_target(target)?;
        let stamp = self.identity.stamp()?;

        let events = self.db.events().events_for_session(session_id).await?;
        let tally = aggregate(events.iter().map(|e| &e.event), &ProductCatalog::default());
        let current = tally.quantity_of(item_key.trim());

        let delta = target - current;
        if delta == 0 {
            debug!(session_id = %session_id, item_key = %item_key, "Count unchanged");
            return Ok(None);
        }

        let event = self
            .keyed(
                InventoryEvent::new(session_id, EventType::CountSet, delta, &stamp.origin())
                    .with_absolute(target),
                item_key,
            )
            .await?;

        self.db.events().append(&event).await?;
        self.nudge();
        Ok(Some(event))
    }

    /// Cancels an event by appending its compensation. The original stays.
    pub async fn undo(&self, event_id: &str) -> SyncResult<InventoryEvent> {
        let stamp = self.identity.stamp()?;

        let original = self
            .db
            .events()
            .get(event_id)
            .await?
            .ok_or_else(|| CoreError::EventNotFound(event_id.to_string()))?;

        let undo = original.event.compensate(&stamp.origin());
        self.db.events().append(&undo).await?;
        self.nudge();

        info!(event_id = %event_id, undo_id = %undo.id, "Event undone");
        Ok(undo)
    }

    /// Attaches the item identity: product id if one exists, else barcode.
    async fn keyed(&self, event: InventoryEvent, item_key: &str) -> SyncResult<InventoryEvent> {
        let key = item_key.trim();
        if key.is_empty() {
            return Err(ValidationError::Required {
                field: "item_key".into(),
            }
            .into());
        }

        match self.db.products().get_by_id(key).await? {
            Some(product) => Ok(event.with_product(product.id)),
            None => Ok(event.with_barcode(normalize_barcode(key)?)),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product for the signed-in company.
    ///
    /// Past `PENDING_UNKNOWN` events for its barcode are left untouched;
    /// reports resolve them by barcode.
    pub async fn create_product(&self, draft: ProductDraft) -> SyncResult<Product> {
        validate_product_draft(&draft)?;
        let company_id = self.identity.company_id()?;

        let product = Product::from_draft(draft, &company_id);
        self.ensure_barcode_free(&company_id, product.barcode.as_deref(), None)
            .await?;

        self.db.products().insert(&product).await?;
        self.nudge();

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, draft: ProductDraft) -> SyncResult<Product> {
        validate_product_draft(&draft)?;
        let company_id = self.identity.company_id()?;

        let mut product = self.product(id).await?;
        product.apply_draft(draft);
        self.ensure_barcode_free(&company_id, product.barcode.as_deref(), Some(id))
            .await?;

        self.db.products().update(&product).await?;
        self.nudge();
        Ok(product)
    }

    /// Soft-deletes a product. Events referencing it keep their id.
    pub async fn deactivate_product(&self, id: &str) -> SyncResult<()> {
        self.identity.stamp()?;
        self.product(id).await?;

        self.db.products().deactivate(id).await?;
        self.nudge();

        info!(product_id = %id, "Product deactivated");
        Ok(())
    }

    pub async fn list_products(&self) -> SyncResult<Vec<Product>> {
        let company_id = self.identity.company_id()?;
        Ok(self.db.products().list_active(&company_id).await?)
    }

    async fn product(&self, id: &str) -> SyncResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    async fn ensure_barcode_free(
        &self,
        company_id: &str,
        barcode: Option<&str>,
        except_id: Option<&str>,
    ) -> SyncResult<()> {
        let Some(barcode) = barcode else {
            return Ok(());
        };

        match self.db.products().get_by_barcode(company_id, barcode).await? {
            Some(existing) if Some(existing.id.as_str()) != except_id => {
                Err(ValidationError::Duplicate {
                    field: "barcode".into(),
                    value: barcode.to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub async fn create_session(
        &self,
        location_id: &str,
        title: &str,
        notes: Option<String>,
    ) -> SyncResult<CountSession> {
        validate_session_title(title)?;
        let stamp = self.identity.stamp()?;

        if location_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "location_id".into(),
            }
            .into());
        }

        let session = CountSession::open(location_id.trim(), title, notes, Some(stamp.user_id));
        self.db.sessions().create(&session).await?;
        self.nudge();

        info!(session_id = %session.id, location_id = %session.location_id, "Session opened");
        Ok(session)
    }

    /// Closes a session. Later appends to it are rejected.
    pub async fn close_session(&self, id: &str) -> SyncResult<LocalSession> {
        self.identity.stamp()?;
        self.session(id).await?;

        let closed = self.db.sessions().close(id).await?;
        self.nudge();

        info!(session_id = %id, "Session closed");
        Ok(closed)
    }

    pub async fn list_open_sessions(&self) -> SyncResult<Vec<LocalSession>> {
        Ok(self.db.sessions().list_open().await?)
    }

    pub async fn list_locations(&self) -> SyncResult<Vec<Location>> {
        Ok(self.db.locations().list_active().await?)
    }

    async fn session(&self, id: &str) -> SyncResult<LocalSession> {
        self.db
            .sessions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()).into())
    }

    // =========================================================================
    // Read Side
    // =========================================================================

    /// Current per-item quantities, resolved against every known product.
    pub async fn tally(&self, session_id: &str) -> SyncResult<SessionTally> {
        self.session(session_id).await?;
        self.fold(session_id).await
    }

    pub async fn report(&self, session_id: &str) -> SyncResult<SessionReport> {
        let session = self.session(session_id).await?;
        let tally = self.fold(session_id).await?;
        Ok(SessionReport::build(&session.session, &tally))
    }

    async fn fold(&self, session_id: &str) -> SyncResult<SessionTally> {
        let events = self.db.events().events_for_session(session_id).await?;
        let catalog = ProductCatalog::new(self.db.products().list_all().await?);
        Ok(aggregate(events.iter().map(|e| &e.event), &catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::identity::{AuthProfile, AuthService};
    use stockcount_core::{SyncStatus, UserRole};
    use stockcount_db::DbConfig;

    struct Fixture {
        db: Database,
        auth: AuthService,
        service: CountingService,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auth = AuthService::start(db.clone()).await.unwrap();
        auth.sign_in(AuthProfile {
            user_id: "user-1".into(),
            email: "ana@example.com".into(),
            name: "Ana".into(),
            role: UserRole::Operator,
            company_id: Some("company-1".into()),
        })
        .await
        .unwrap();

        let service = CountingService::new(db.clone(), auth.identity());
        Fixture { db, auth, service }
    }

    fn draft(name: &str, barcode: &str) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            barcode: Some(barcode.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_barcode_resolves_after_product_creation() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();

        let first = f.service.on_scan(&session.id, "789\r\n").await.unwrap();
        assert!(first.unknown);
        assert_eq!(first.event.event_type, EventType::PendingUnknown);
        assert_eq!(first.event.product_id, None);

        let tally = f.service.tally(&session.id).await.unwrap();
        let item = tally.get("789").unwrap();
        assert_eq!(item.quantity, 1);
        assert!(item.product_id.is_none());

        let product = f.service.create_product(draft("Sparkling water", "789")).await.unwrap();

        let second = f.service.on_scan(&session.id, "789").await.unwrap();
        assert!(!second.unknown);
        assert_eq!(second.event.event_type, EventType::ScanAdd);
        assert_eq!(second.event.product_id.as_deref(), Some(product.id.as_str()));

        let stored = f.db.events().get(&first.event.id).await.unwrap().unwrap();
        assert_eq!(stored.event.barcode.as_deref(), Some("789"));
        assert_eq!(stored.event.product_id, None);
        assert_eq!(stored.event.event_type, EventType::PendingUnknown);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_scans() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        f.service.on_scan(&session.id, "111").await.unwrap();
        f.service.close_session(&session.id).await.unwrap();

        let err = f.service.on_scan(&session.id, "111").await.unwrap_err();
        assert!(err.is_validation());

        let events = f.db.events().events_for_session(&session.id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_scan_is_rejected() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();

        assert!(f.service.on_scan(&session.id, "  \n").await.unwrap_err().is_validation());
        assert_eq!(f.db.events().count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undo_restores_quantity_and_keeps_both_events() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        let product = f.service.create_product(draft("Coffee", "111")).await.unwrap();

        f.service.on_scan(&session.id, "111").await.unwrap();
        let adjust = f.service.adjust(&session.id, &product.id, 4).await.unwrap();
        assert_eq!(f.service.tally(&session.id).await.unwrap().quantity_of(&product.id), 5);

        let undo = f.service.undo(&adjust.id).await.unwrap();
        assert_eq!(undo.qty_delta, -4);
        assert_eq!(undo.product_id.as_deref(), Some(product.id.as_str()));
        assert_eq!(f.service.tally(&session.id).await.unwrap().quantity_of(&product.id), 1);

        assert!(f.db.events().get(&adjust.id).await.unwrap().is_some());
        assert!(f.db.events().get(&undo.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_undo_unknown_event() {
        let f = fixture().await;
        let err = f.service.undo("missing").await.unwrap_err();
        assert!(matches!(err, SyncError::Domain(CoreError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_count_appends_difference() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        for _ in 0..3 {
            f.service.on_scan(&session.id, "555").await.unwrap();
        }

        let event = f.service.set_count(&session.id, "555", 10).await.unwrap().unwrap();
        assert_eq!(event.event_type, EventType::CountSet);
        assert_eq!(event.qty_delta, 7);
        assert_eq!(event.qty_absolute, Some(10));
        assert_eq!(f.service.tally(&session.id).await.unwrap().quantity_of("555"), 10);

        assert!(f.service.set_count(&session.id, "555", 10).await.unwrap().is_none());
        assert!(f.service.set_count(&session.id, "555", -1).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_zero_adjust_is_rejected() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        assert!(f.service.adjust(&session.id, "111", 0).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_duplicate_barcode_in_company() {
        let f = fixture().await;
        let first = f.service.create_product(draft("Coffee", "111")).await.unwrap();

        let err = f.service.create_product(draft("Tea", " 111 ")).await.unwrap_err();
        assert!(err.is_validation());

        // Re-saving the same product with its own barcode is fine.
        let updated = f.service.update_product(&first.id, draft("Coffee 500g", "111")).await.unwrap();
        assert_eq!(updated.name, "Coffee 500g");

        // A deactivated product frees its barcode.
        f.service.deactivate_product(&first.id).await.unwrap();
        f.service.create_product(draft("Tea", "111")).await.unwrap();
    }

    #[tokio::test]
    async fn test_writes_require_sign_in() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        f.auth.sign_out().await.unwrap();

        assert!(matches!(
            f.service.on_scan(&session.id, "111").await,
            Err(SyncError::NotAuthenticated)
        ));
        assert!(matches!(
            f.service.create_product(draft("Coffee", "111")).await,
            Err(SyncError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_new_rows_are_pending() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        let product = f.service.create_product(draft("Coffee", "111")).await.unwrap();
        let scan = f.service.on_scan(&session.id, "111").await.unwrap();

        let stored = f.db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.sync_status, SyncStatus::Pending);
        assert_eq!(stored.session.created_by.as_deref(), Some("user-1"));

        let stored = f.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.company_id, "company-1");

        let stored = f.db.events().get(&scan.event.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.sync_status, SyncStatus::Pending);
        assert_eq!(stored.event.device_id, f.auth.identity().device_id());
    }

    #[tokio::test]
    async fn test_report_lists_known_before_unknown() {
        let f = fixture().await;
        let session = f.service.create_session("loc-1", "Shelf A", None).await.unwrap();
        f.service.create_product(draft("Coffee", "111")).await.unwrap();

        f.service.on_scan(&session.id, "999").await.unwrap();
        f.service.on_scan(&session.id, "111").await.unwrap();
        f.service.on_scan(&session.id, "111").await.unwrap();

        let report = f.service.report(&session.id).await.unwrap();
        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.lines[0].name, "Coffee");
        assert_eq!(report.lines[0].quantity, 2);
        assert!(report.lines[1].unknown);
        assert_eq!(report.total_quantity, 3);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let f = fixture().await;
        assert!(matches!(
            f.service.tally("nope").await,
            Err(SyncError::Domain(CoreError::SessionNotFound(_)))
        ));
        assert!(matches!(
            f.service.close_session("nope").await,
            Err(SyncError::Domain(CoreError::SessionNotFound(_)))
        ));
    }
}
