//! # Repository Module
//!
//! Database repository implementations for StockCount.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Writes What                                      │
//! │                                                                         │
//! │  CountingService                       SyncEngine                       │
//! │       │                                     │                           │
//! │       │ append / create / close             │ pending_* / mark_*        │
//! │       ▼                                     ▼ upsert_pulled             │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐    │
//! │  │    Event     │ │   Session    │ │   Product    │ │    Sync      │    │
//! │  │  Repository  │ │  Repository  │ │  Repository  │ │  Repository  │    │
//! │  └──────────────┘ └──────────────┘ └──────────────┘ └──────────────┘    │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐                     │
//! │  │   Location   │ │    Device    │ │     Auth     │                     │
//! │  │  (read-only) │ │ id + cursor  │ │  local user  │                     │
//! │  └──────────────┘ └──────────────┘ └──────────────┘                     │
//! │                                                                         │
//! │  Only the sync engine writes sync_status / sync_attempts.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`EventRepository`](event::EventRepository) - Append-only event log
//! - [`SessionRepository`](session::SessionRepository) - Count sessions
//! - [`ProductRepository`](product::ProductRepository) - Product lookup and edits
//! - [`LocationRepository`](location::LocationRepository) - Counting sites
//! - [`DeviceRepository`](device::DeviceRepository) - Device id and pull cursor
//! - [`AuthRepository`](auth::AuthRepository) - Signed-in user
//! - [`SyncRepository`](sync::SyncRepository) - Pull application

pub mod auth;
pub mod device;
pub mod event;
pub mod location;
pub mod product;
pub mod session;
pub mod sync;
