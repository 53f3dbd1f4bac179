//! # stockcount-db: Local Event Store for StockCount
//!
//! SQLite persistence for the offline counting engine, using sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        StockCount Data Flow                             │
//! │                                                                         │
//! │  CountingService::on_scan / SyncEngine::run_cycle                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                  stockcount-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │    │
//! │  │   │               │    │ EventRepo     │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ SessionRepo   │    │ 001_initial  │    │    │
//! │  │   │ Connection    │    │ ProductRepo   │    │   _schema    │    │    │
//! │  │   │ Management    │    │ SyncRepo ...  │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database                             │    │
//! │  │   <data dir>/stockcount/stockcount.db                           │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockcount_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/stockcount.db")).await?;
//!
//! db.events().append(&event).await?;
//! let events = db.events().events_for_session(&session_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::auth::AuthRepository;
pub use repository::device::DeviceRepository;
pub use repository::event::EventRepository;
pub use repository::location::LocationRepository;
pub use repository::product::ProductRepository;
pub use repository::session::SessionRepository;
pub use repository::sync::{PullSummary, SyncRepository};
