//! # stockcount-sync: Sync Engine for StockCount
//!
//! This crate keeps the counting app usable without a network and moves
//! local writes to the backend whenever one is reachable.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Layer Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │                 CountingService (command layer)                  │   │
//! │  │                                                                  │   │
//! │  │  on_scan / adjust / set_count / undo / products / sessions       │   │
//! │  │  Writes to the local store only, then nudges the scheduler       │   │
//! │  └────────────────────────────┬─────────────────────────────────────┘   │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                   │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐     │
//! │  │ SyncScheduler  │  │  SyncEngine    │  │  AuthService           │     │
//! │  │                │  │                │  │                        │     │
//! │  │ Timer, online  │─►│ push sessions, │  │ Device id, signed-in   │     │
//! │  │ watch, manual  │  │ products,      │  │ user, offline PIN      │     │
//! │  │ trigger, retry │  │ events → pull  │  │ unlock (argon2)        │     │
//! │  │ backoff        │  │ → refresh      │  │                        │     │
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────┘     │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                     ┌────────────────┐                                  │
//! │                     │ RemoteBackend  │  HttpRemote: POST /rpc/{name}    │
//! │                     │ (async trait)  │  (reqwest, bearer API key)       │
//! │                     └────────────────┘                                  │
//! │                                                                         │
//! │  STATUS (to the UI):                                                    │
//! │  • watch::Receiver<SyncSnapshot> - online, pending, syncing, last error │
//! │  • watch::Receiver<Option<LocalAuth>> - sign-in changes                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Sync configuration (backend URL, intervals, DB path)
//! - [`engine`] - One push → pull → refresh cycle
//! - [`error`] - Sync error types
//! - [`identity`] - Device id, signed-in user, offline PIN
//! - [`protocol`] - Request and response bodies of the backend RPCs
//! - [`remote`] - Backend client trait and HTTP implementation
//! - [`scheduler`] - Background task deciding when cycles run
//! - [`service`] - Counting commands
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockcount_db::{Database, DbConfig};
//! use stockcount_sync::{AuthService, CountingService, HttpRemote, SyncConfig, SyncEngine, SyncError, SyncScheduler};
//!
//! let config = SyncConfig::load_or_default(None);
//! let path = config.database_path().ok_or(SyncError::InvalidConfig("no data dir".into()))?;
//! let db = Database::new(DbConfig::new(path)).await?;
//!
//! let auth = AuthService::start(db.clone()).await?;
//! let remote = Arc::new(HttpRemote::new(&config.remote)?);
//! let engine = Arc::new(SyncEngine::new(db.clone(), remote, auth.identity(), &config.sync));
//!
//! let (online_tx, online_rx) = tokio::sync::watch::channel(true);
//! let (scheduler, handle) = SyncScheduler::new(engine.clone(), config.sync.clone(), online_rx);
//! tokio::spawn(scheduler.run());
//!
//! let counting = CountingService::new(db, auth.identity()).with_scheduler(handle);
//! let outcome = counting.on_scan(&session_id, "7891234567895").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod remote;
pub mod scheduler;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, RemoteSettings, SyncConfig, SyncSettings};
pub use engine::{CycleOutcome, CycleReport, SkipReason, SyncEngine, SyncSnapshot};
pub use error::{SyncError, SyncResult};
pub use identity::{AuthProfile, AuthService, IdentityContext, Stamp};
pub use protocol::{PullResponse, PushEventsResponse, RemoteReport};
pub use remote::{HttpRemote, RemoteBackend};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use service::{CountingService, ScanOutcome};
