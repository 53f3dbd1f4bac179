//! # Sync Engine
//!
//! One sync cycle between the local store and the backend.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          run_cycle()                                    │
//! │                                                                         │
//! │  online?  ── no ──► Skipped(Offline)                                    │
//! │  permit?  ── no ──► Skipped(AlreadyRunning)   (Semaphore of size 1)     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  1. PUSH                                                                │
//! │     a. pending sessions  → create_session (+ close_session if closed)   │
//! │     b. pending products  → upsert_products                              │
//! │     c. pending events    → push_events, in batches                      │
//! │        accepted ids      → synced, attempts = 0                         │
//! │        missing ids       → failed, attempts + 1                         │
//! │        transport error   → whole batch failed, attempts + 1             │
//! │     │                                                                   │
//! │     ▼   (runs even when push failed)                                    │
//! │  2. PULL  since = last_sync_at                                          │
//! │     upsert products/sessions/locations + cursor, one transaction        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  3. REFRESH pending count → SyncSnapshot (watch channel)                │
//! │                                                                         │
//! │  Every failure lands in `last_error`; the next cycle retries.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pending set is read once at push start. Events appended while a push
//! is in flight go out with the next cycle.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};
use ts_rs::TS;

use stockcount_core::{InventoryEvent, SessionStatus};
use stockcount_db::{Database, PullSummary};

use crate::config::SyncSettings;
use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityContext;
use crate::remote::RemoteBackend;

/// Recorded on events the backend did not acknowledge.
const NOT_ACKNOWLEDGED: &str = "not acknowledged by backend";

// =============================================================================
// Status Snapshot
// =============================================================================

/// What the UI shows about sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncSnapshot {
    pub device_id: String,
    /// Server time of the last successful pull.
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub is_online: bool,
    /// Events still waiting for the backend (pending or failed).
    pub pending_count: i64,
    pub is_syncing: bool,
    pub last_error: Option<String>,
}

impl SyncSnapshot {
    fn new(device_id: &str) -> Self {
        SyncSnapshot {
            device_id: device_id.to_string(),
            last_sync_at: None,
            is_online: false,
            pending_count: 0,
            is_syncing: false,
            last_error: None,
        }
    }
}

// =============================================================================
// Cycle Outcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub sessions_pushed: usize,
    pub products_pushed: usize,
    pub events_synced: usize,
    pub events_failed: usize,
    /// `None` when the pull failed.
    pub pulled: Option<PullSummary>,
    pub pending_after: i64,
    pub errors: Vec<String>,
}

impl CycleReport {
    /// True when every phase succeeded and every event was acknowledged.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn last_error(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("; "))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Completed(CycleReport),
}

impl CycleOutcome {
    /// True for a completed cycle that hit any error.
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Completed(report) if !report.is_clean())
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Pushes local changes, pulls reference data, publishes status.
pub struct SyncEngine {
    db: Database,
    remote: Arc<dyn RemoteBackend>,
    identity: IdentityContext,
    batch_size: usize,
    /// At most one cycle at a time; extra requests are dropped.
    cycle_guard: Semaphore,
    status_tx: watch::Sender<SyncSnapshot>,
}

impl SyncEngine {
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteBackend>,
        identity: IdentityContext,
        settings: &SyncSettings,
    ) -> Self {
        let (status_tx, _) = watch::channel(SyncSnapshot::new(identity.device_id()));

        SyncEngine {
            db,
            remote,
            identity,
            batch_size: settings.batch_size.max(1),
            cycle_guard: Semaphore::new(1),
            status_tx,
        }
    }

    /// Receiver for status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.status_tx.subscribe()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.status_tx.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.status_tx.borrow().is_online
    }

    /// Records connectivity. Returns true on an offline → online transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.status_tx.send_if_modified(|s| {
            if s.is_online == online {
                return false;
            }
            s.is_online = online;
            true
        });
        if changed && online {
            info!("Connectivity restored");
        } else if changed {
            debug!("Connectivity lost");
        }
        changed && online
    }

    /// Runs one cycle unless offline or another cycle is in progress.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if !self.is_online() {
            debug!("Offline, skipping sync cycle");
            return CycleOutcome::Skipped(SkipReason::Offline);
        }

        let _permit = match self.cycle_guard.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Sync cycle already running, request dropped");
                return CycleOutcome::Skipped(SkipReason::AlreadyRunning);
            }
        };

        self.status_tx.send_modify(|s| s.is_syncing = true);
        info!("Sync cycle starting");

        let mut report = CycleReport::default();

        self.push_phase(&mut report).await;
        self.pull_phase(&mut report).await;

        match self.refresh_status().await {
            Ok(pending) => report.pending_after = pending,
            Err(e) => report.errors.push(format!("refresh: {e}")),
        }

        let last_error = report.last_error();
        self.status_tx.send_modify(|s| {
            s.is_syncing = false;
            s.last_error = last_error.clone();
        });

        if report.is_clean() {
            info!(
                sessions = report.sessions_pushed,
                products = report.products_pushed,
                events = report.events_synced,
                pending = report.pending_after,
                "Sync cycle complete"
            );
        } else {
            warn!(
                events_synced = report.events_synced,
                events_failed = report.events_failed,
                pending = report.pending_after,
                error = last_error.as_deref().unwrap_or_default(),
                "Sync cycle finished with errors"
            );
        }

        CycleOutcome::Completed(report)
    }

    /// Re-reads the pending count and the pull cursor into the snapshot.
    pub async fn refresh_status(&self) -> SyncResult<i64> {
        let pending = self.db.events().count_pending().await?;
        let last_sync_at = self.db.device().last_sync_at().await?;

        self.status_tx.send_if_modified(|s| {
            let changed = s.pending_count != pending || s.last_sync_at != last_sync_at;
            s.pending_count = pending;
            s.last_sync_at = last_sync_at;
            changed
        });

        Ok(pending)
    }

    // =========================================================================
    // Push
    // =========================================================================

    pub(crate) async fn push_phase(&self, report: &mut CycleReport) {
        if let Err(e) = self.push_sessions(report).await {
            report.errors.push(format!("push sessions: {e}"));
        }
        if let Err(e) = self.push_products(report).await {
            report.errors.push(format!("push products: {e}"));
        }
        if let Err(e) = self.push_events(report).await {
            report.errors.push(format!("push events: {e}"));
        }
    }

    /// Creates (and closes) sessions the backend has not seen yet.
    ///
    /// A failure is recorded on that session only.
    async fn push_sessions(&self, report: &mut CycleReport) -> SyncResult<()> {
        let pending = self.db.sessions().pending_sessions().await?;

        for local in pending {
            let session = &local.session;
            let result = async {
                self.remote.create_session(session).await?;
                if session.status == SessionStatus::Closed {
                    self.remote.close_session(&session.id, session.closed_at).await?;
                }
                Ok::<(), SyncError>(())
            }
            .await;

            match result {
                Ok(()) => {
                    // A close that landed mid-push keeps the row pending.
                    if self.db.sessions().mark_synced(&session.id, session.updated_at).await? {
                        report.sessions_pushed += 1;
                    }
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Session push failed");
                    self.db.sessions().mark_failed(&session.id, &e.to_string()).await?;
                    report.errors.push(format!("session {}: {e}", session.id));
                }
            }
        }

        Ok(())
    }

    async fn push_products(&self, report: &mut CycleReport) -> SyncResult<()> {
        let pending = self.db.products().pending_products().await?;

        for chunk in pending.chunks(self.batch_size) {
            match self.remote.upsert_products(chunk).await {
                Ok(accepted_ids) => {
                    let accepted: HashSet<&str> = accepted_ids.iter().map(String::as_str).collect();
                    let (synced, rejected): (Vec<_>, Vec<_>) =
                        chunk.iter().partition(|p| accepted.contains(p.id.as_str()));

                    let synced: Vec<(String, DateTime<Utc>)> =
                        synced.iter().map(|p| (p.id.clone(), p.updated_at)).collect();
                    let rejected: Vec<String> = rejected.iter().map(|p| p.id.clone()).collect();

                    self.db.products().mark_products_synced(&synced).await?;
                    if !rejected.is_empty() {
                        self.db.products().mark_products_failed(&rejected, NOT_ACKNOWLEDGED).await?;
                        report.errors.push(format!("{} products {NOT_ACKNOWLEDGED}", rejected.len()));
                    }
                    report.products_pushed += synced.len();
                }
                Err(e) => {
                    warn!(count = chunk.len(), error = %e, "Product push failed");
                    let ids: Vec<String> = chunk.iter().map(|p| p.id.clone()).collect();
                    self.db.products().mark_products_failed(&ids, &e.to_string()).await?;
                    report.errors.push(format!("products: {e}"));
                }
            }
        }

        Ok(())
    }

    /// Sends the pending-event snapshot in batches.
    ///
    /// Stops at the first transport error; the rest stay as they were and
    /// go out next cycle.
    async fn push_events(&self, report: &mut CycleReport) -> SyncResult<()> {
        let pending = self.db.events().pending_events().await?;
        if pending.is_empty() {
            debug!("No pending events");
            return Ok(());
        }

        info!(count = pending.len(), batch_size = self.batch_size, "Pushing events");

        for chunk in pending.chunks(self.batch_size) {
            let events: Vec<InventoryEvent> = chunk.iter().map(|e| e.event.clone()).collect();
            let sent_ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();

            match self.remote.push_events(self.identity.device_id(), &events).await {
                Ok(response) => {
                    let accepted: HashSet<&str> =
                        response.accepted_ids.iter().map(String::as_str).collect();
                    let (synced, failed): (Vec<String>, Vec<String>) = sent_ids
                        .into_iter()
                        .partition(|id| accepted.contains(id.as_str()));

                    self.db
                        .events()
                        .apply_push_results(&synced, &failed, NOT_ACKNOWLEDGED)
                        .await?;

                    debug!(synced = synced.len(), failed = failed.len(), "Event batch acknowledged");
                    report.events_synced += synced.len();
                    report.events_failed += failed.len();
                    if !failed.is_empty() {
                        report.errors.push(format!("{} events {NOT_ACKNOWLEDGED}", failed.len()));
                    }
                }
                Err(e) => {
                    warn!(count = sent_ids.len(), error = %e, "Event push failed");
                    self.db
                        .events()
                        .apply_push_results(&[], &sent_ids, &e.to_string())
                        .await?;
                    report.events_failed += sent_ids.len();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Pull
    // =========================================================================

    pub(crate) async fn pull_phase(&self, report: &mut CycleReport) {
        match self.pull().await {
            Ok(summary) => report.pulled = Some(summary),
            Err(e) => {
                warn!(error = %e, "Pull failed");
                report.errors.push(format!("pull: {e}"));
            }
        }
    }

    async fn pull(&self) -> SyncResult<PullSummary> {
        let since = self.db.device().last_sync_at().await?;
        debug!(since = ?since, "Pulling changes");

        let response = self.remote.pull(self.identity.device_id(), since).await?;

        let summary = self
            .db
            .sync_state()
            .upsert_pulled(
                &response.products,
                &response.sessions,
                &response.locations,
                response.server_time,
            )
            .await?;

        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::identity::{AuthProfile, AuthService};
    use crate::protocol::PullResponse;
    use crate::remote::mock::{MockRemote, PushBehavior};
    use stockcount_core::{
        CountSession, EventType, Location, LocationType, Product, ProductDraft, SyncStatus, UserRole,
    };
    use stockcount_db::DbConfig;

    struct Fixture {
        db: Database,
        remote: Arc<MockRemote>,
        engine: SyncEngine,
        auth: AuthService,
        session: CountSession,
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

        let session = CountSession::open("loc-1", "Aisle 3", None, Some("user-1".into()));
        db.sessions().create(&session).await.unwrap();

        let remote = Arc::new(MockRemote::new());
        let engine = SyncEngine::new(db.clone(), remote.clone(), auth.identity(), &SyncSettings::default());
        engine.set_online(true);

        Fixture {
            db,
            remote,
            engine,
            auth,
            session,
        }
    }

    async fn append_scans(f: &Fixture, count: usize) -> Vec<String> {
        let origin = f.auth.identity().stamp().unwrap().origin();
        let mut ids = Vec::new();
        for i in 0..count {
            let event = InventoryEvent::new(&f.session.id, EventType::PendingUnknown, 1, &origin)
                .with_barcode(format!("789{i}"));
            f.db.events().append(&event).await.unwrap();
            ids.push(event.id);
        }
        ids
    }

    fn completed(outcome: CycleOutcome) -> CycleReport {
        match outcome {
            CycleOutcome::Completed(report) => report,
            other => panic!("expected a completed cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clean_cycle_syncs_everything() {
        let f = fixture().await;
        append_scans(&f, 3).await;

        let report = completed(f.engine.run_cycle().await);
        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(report.sessions_pushed, 1);
        assert_eq!(report.events_synced, 3);
        assert_eq!(report.pending_after, 0);
        assert!(report.pulled.is_some());

        // Sessions reach the backend before their events.
        assert_eq!(*f.remote.created_sessions.lock().unwrap(), vec![f.session.id.clone()]);

        let snapshot = f.engine.snapshot();
        assert_eq!(snapshot.pending_count, 0);
        assert!(snapshot.last_sync_at.is_some());
        assert!(!snapshot.is_syncing);
        assert_eq!(snapshot.last_error, None);
    }

    #[tokio::test]
    async fn test_offline_cycle_is_skipped() {
        let f = fixture().await;
        append_scans(&f, 1).await;
        f.engine.set_online(false);

        assert_eq!(f.engine.run_cycle().await, CycleOutcome::Skipped(SkipReason::Offline));
        assert_eq!(f.remote.push_calls(), 0);
        assert_eq!(f.remote.pull_calls(), 0);
    }

    #[tokio::test]
    async fn test_at_most_one_cycle_runs() {
        let f = fixture().await;
        append_scans(&f, 2).await;
        f.remote.set_push_delay(Duration::from_millis(100));

        let (a, b) = tokio::join!(f.engine.run_cycle(), f.engine.run_cycle());

        let skipped = [&a, &b]
            .iter()
            .filter(|o| ***o == CycleOutcome::Skipped(SkipReason::AlreadyRunning))
            .count();
        assert_eq!(skipped, 1);
        assert_eq!(f.remote.push_calls(), 1);
        assert_eq!(f.remote.pull_calls(), 1);
    }

    #[tokio::test]
    async fn test_append_during_push_goes_out_next_cycle() {
        let f = fixture().await;
        let early = append_scans(&f, 2).await;
        f.remote.set_push_delay(Duration::from_millis(300));

        let origin = f.auth.identity().stamp().unwrap().origin();
        let late = InventoryEvent::new(&f.session.id, EventType::PendingUnknown, 1, &origin).with_barcode("999");

        let (outcome, ()) = tokio::join!(f.engine.run_cycle(), async {
            while !f.engine.snapshot().is_syncing {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            f.db.events().append(&late).await.unwrap();
        });

        let report = completed(outcome);
        assert_eq!(report.events_synced, 2);
        assert_eq!(f.remote.pushed.lock().unwrap()[0], early);

        let stored = f.db.events().get(&late.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.sync_status, SyncStatus::Pending);
        assert_eq!(report.pending_after, 1);

        completed(f.engine.run_cycle().await);
        assert_eq!(f.remote.pushed.lock().unwrap()[1], vec![late.id.clone()]);
        let stored = f.db.events().get(&late.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_partial_ack_marks_only_acknowledged() {
        let f = fixture().await;
        let ids = append_scans(&f, 3).await;
        f.remote.set_push(PushBehavior::AcceptOnly(HashSet::from([ids[0].clone(), ids[1].clone()])));

        let report = completed(f.engine.run_cycle().await);
        assert_eq!(report.events_synced, 2);
        assert_eq!(report.events_failed, 1);
        assert!(!report.is_clean());

        for id in &ids[..2] {
            let event = f.db.events().get(id).await.unwrap().unwrap();
            assert_eq!(event.sync.sync_status, SyncStatus::Synced);
            assert_eq!(event.sync.sync_attempts, 0);
        }
        let third = f.db.events().get(&ids[2]).await.unwrap().unwrap();
        assert_eq!(third.sync.sync_status, SyncStatus::Failed);
        assert_eq!(third.sync.sync_attempts, 1);
        assert_eq!(f.engine.snapshot().pending_count, 1);
    }

    #[tokio::test]
    async fn test_push_failure_still_pulls() {
        let f = fixture().await;
        let ids = append_scans(&f, 5).await;
        f.remote.set_push(PushBehavior::Fail("connection reset".into()));

        let report = completed(f.engine.run_cycle().await);
        assert_eq!(report.events_failed, 5);
        assert!(report.pulled.is_some());
        assert_eq!(f.remote.pull_calls(), 1);

        for id in &ids {
            let event = f.db.events().get(id).await.unwrap().unwrap();
            assert_eq!(event.sync.sync_status, SyncStatus::Failed);
            assert_eq!(event.sync.sync_attempts, 1);
            assert!(event.sync.last_sync_error.as_deref().unwrap().contains("connection reset"));
        }

        let snapshot = f.engine.snapshot();
        assert_eq!(snapshot.pending_count, 5);
        assert!(snapshot.last_error.unwrap().contains("connection reset"));

        // Failed events are retried on the next cycle.
        f.remote.set_push(PushBehavior::AcceptAll);
        let report = completed(f.engine.run_cycle().await);
        assert!(report.is_clean());
        assert_eq!(report.events_synced, 5);
        assert_eq!(f.engine.snapshot().last_error, None);
    }

    #[tokio::test]
    async fn test_pull_failure_keeps_push_results() {
        let f = fixture().await;
        append_scans(&f, 2).await;
        f.remote.fail_pull(Some("gateway timeout"));

        let report = completed(f.engine.run_cycle().await);
        assert_eq!(report.events_synced, 2);
        assert!(report.pulled.is_none());
        assert_eq!(f.db.events().count_pending().await.unwrap(), 0);
        assert_eq!(f.db.device().last_sync_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let f = fixture().await;
        append_scans(&f, 5).await;
        let settings = SyncSettings {
            batch_size: 2,
            ..Default::default()
        };
        let engine = SyncEngine::new(f.db.clone(), f.remote.clone(), f.auth.identity(), &settings);
        engine.set_online(true);

        let report = completed(engine.run_cycle().await);
        assert_eq!(report.events_synced, 5);
        assert_eq!(f.remote.push_calls(), 3);
    }

    #[tokio::test]
    async fn test_reference_push_failure_does_not_stop_events() {
        let f = fixture().await;
        append_scans(&f, 1).await;
        let product = Product::from_draft(
            ProductDraft {
                name: "Cola".into(),
                barcode: Some("7891".into()),
                ..Default::default()
            },
            "company-1",
        );
        f.db.products().insert(&product).await.unwrap();
        f.remote.fail_reference_push(Some("bad gateway"));

        let report = completed(f.engine.run_cycle().await);
        assert_eq!(report.events_synced, 1);
        assert_eq!(report.sessions_pushed, 0);

        let session = f.db.sessions().get_by_id(&f.session.id).await.unwrap().unwrap();
        assert_eq!(session.sync.sync_status, SyncStatus::Failed);
        assert_eq!(session.sync.sync_attempts, 1);
        assert_eq!(f.db.products().pending_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_is_created_then_closed() {
        let f = fixture().await;
        f.db.sessions().close(&f.session.id).await.unwrap();

        let report = completed(f.engine.run_cycle().await);
        assert!(report.is_clean());
        assert_eq!(*f.remote.created_sessions.lock().unwrap(), vec![f.session.id.clone()]);
        assert_eq!(*f.remote.closed_sessions.lock().unwrap(), vec![f.session.id.clone()]);

        let session = f.db.sessions().get_by_id(&f.session.id).await.unwrap().unwrap();
        assert_eq!(session.sync.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_pull_applies_reference_data_and_cursor() {
        let f = fixture().await;
        let server_time = Utc::now();
        let now = Utc::now();
        let mut response = PullResponse::empty(server_time);
        response.locations.push(Location {
            id: "loc-2".into(),
            company_id: "company-1".into(),
            name: "Back Store".into(),
            location_type: LocationType::Warehouse,
            active: true,
            created_at: now,
            updated_at: now,
        });
        f.remote.set_pull_response(response);

        completed(f.engine.run_cycle().await);
        assert_eq!(f.db.device().last_sync_at().await.unwrap(), Some(server_time));
        assert!(f.db.locations().get_by_id("loc-2").await.unwrap().is_some());

        // The next pull starts from the stored cursor.
        completed(f.engine.run_cycle().await);
        let pulls = f.remote.pulls.lock().unwrap().clone();
        assert_eq!(pulls, vec![None, Some(server_time)]);
    }

    #[tokio::test]
    async fn test_crash_between_push_and_pull_recovers() {
        let f = fixture().await;
        let ids = append_scans(&f, 3).await;

        // Push completes, then the process dies before pulling.
        let mut report = CycleReport::default();
        f.engine.push_phase(&mut report).await;
        assert_eq!(report.events_synced, 3);
        assert_eq!(f.remote.pull_calls(), 0);
        drop(f.engine);

        // Restart with the same store.
        let engine = SyncEngine::new(f.db.clone(), f.remote.clone(), f.auth.identity(), &SyncSettings::default());
        engine.set_online(true);
        let report = completed(engine.run_cycle().await);

        assert!(report.is_clean());
        assert_eq!(report.events_synced, 0);
        assert_eq!(f.remote.pushed_ids(), ids);
        assert_eq!(*f.remote.pulls.lock().unwrap(), vec![None]);
        assert!(f.db.device().last_sync_at().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_online_reports_transition() {
        let f = fixture().await;
        assert!(!f.engine.set_online(true));
        assert!(!f.engine.set_online(false));
        assert!(f.engine.set_online(true));

        let mut rx = f.engine.subscribe();
        f.engine.set_online(false);
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_online);
    }
}
