//! # Identity and Device Context
//!
//! Who is counting, on which device.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  auth collaborator ──► AuthService ──► local_auth row (SQLite)          │
//! │  (online login)        │  sign_in / set_pin / unlock_with_pin /        │
//! │                        │  sign_out                                      │
//! │                        │                                                │
//! │                        ▼ watch::Sender<Option<LocalAuth>>               │
//! │                                                                         │
//! │  IdentityContext (read-only, cloned into every service)                 │
//! │    device_id()  - generated once, stored in device_state                │
//! │    stamp()      - { device_id, user_id, company_id } or                 │
//! │                   SyncError::NotAuthenticated                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The PIN is an offline unlock for the profile already stored on the
//! device. It is hashed with argon2 and never leaves the device.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use stockcount_core::{EventOrigin, LocalAuth, UserRole, ValidationError, DEFAULT_COMPANY_ID};
use stockcount_db::Database;

use crate::error::{SyncError, SyncResult};

const PIN_MIN_LEN: usize = 4;
const PIN_MAX_LEN: usize = 8;

// =============================================================================
// Stamp
// =============================================================================

/// Identity written onto every event, product and session created locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub device_id: String,
    pub user_id: String,
    pub company_id: String,
}

impl Stamp {
    pub fn origin(&self) -> EventOrigin {
        EventOrigin {
            device_id: self.device_id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

// =============================================================================
// Identity Context
// =============================================================================

/// Read-only view of the device id and the signed-in user.
#[derive(Debug, Clone)]
pub struct IdentityContext {
    device_id: Arc<str>,
    user: watch::Receiver<Option<LocalAuth>>,
}

impl IdentityContext {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn current_user(&self) -> Option<LocalAuth> {
        self.user.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Company of the signed-in user.
    pub fn company_id(&self) -> SyncResult<String> {
        self.user
            .borrow()
            .as_ref()
            .map(|u| u.company_id.clone())
            .ok_or(SyncError::NotAuthenticated)
    }

    /// Identity for a new local write.
    ///
    /// ## Errors
    /// `SyncError::NotAuthenticated` when nobody is signed in.
    pub fn stamp(&self) -> SyncResult<Stamp> {
        let user = self.user.borrow();
        let user = user.as_ref().ok_or(SyncError::NotAuthenticated)?;
        Ok(Stamp {
            device_id: self.device_id.to_string(),
            user_id: user.user_id.clone(),
            company_id: user.company_id.clone(),
        })
    }

    /// Receiver for sign-in and sign-out changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<LocalAuth>> {
        self.user.clone()
    }
}

// =============================================================================
// Auth Service
// =============================================================================

/// Profile handed over by the online login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthProfile {
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    /// Missing for single-tenant backends.
    #[serde(default)]
    pub company_id: Option<String>,
}

fn default_role() -> UserRole {
    UserRole::Operator
}

/// Populates the identity context and keeps the stored profile.
pub struct AuthService {
    db: Database,
    identity: IdentityContext,
    user_tx: watch::Sender<Option<LocalAuth>>,
}

impl AuthService {
    /// Reads (or generates) the device id and starts signed out.
    pub async fn start(db: Database) -> SyncResult<Self> {
        let device_id = db.device().device_id().await?;
        let (user_tx, user_rx) = watch::channel(None);

        info!(device_id = %device_id, "Identity context ready");

        Ok(AuthService {
            db,
            identity: IdentityContext {
                device_id: Arc::from(device_id),
                user: user_rx,
            },
            user_tx,
        })
    }

    /// Handle for the rest of the app.
    pub fn identity(&self) -> IdentityContext {
        self.identity.clone()
    }

    /// Stores the profile from an online login and signs it in.
    pub async fn sign_in(&self, profile: AuthProfile) -> SyncResult<LocalAuth> {
        if profile.user_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "user_id".into(),
            }
            .into());
        }

        let auth = LocalAuth {
            user_id: profile.user_id,
            email: profile.email,
            name: profile.name,
            role: profile.role,
            company_id: profile
                .company_id
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COMPANY_ID.to_string()),
            pin_hash: None,
            last_login_at: Utc::now(),
        };

        self.db.auth().save(&auth).await?;
        // Re-read so a PIN kept for the same user is reflected.
        let stored = self.db.auth().get().await?.unwrap_or(auth);

        info!(user_id = %stored.user_id, company_id = %stored.company_id, "Signed in");
        self.user_tx.send_replace(Some(stored.clone()));
        Ok(stored)
    }

    /// Sets the offline unlock PIN for the stored profile.
    pub async fn set_pin(&self, pin: &str) -> SyncResult<()> {
        validate_pin(pin)?;
        let hash = hash_pin(pin)?;
        self.db.auth().set_pin_hash(&hash).await?;

        if let Some(user) = self.user_tx.borrow().as_ref() {
            info!(user_id = %user.user_id, "Offline PIN set");
        }
        self.user_tx.send_modify(|user| {
            if let Some(user) = user {
                user.pin_hash = Some(hash.clone());
            }
        });
        Ok(())
    }

    /// Restores the stored profile without the network.
    ///
    /// ## Errors
    /// - `NotAuthenticated` when no profile is stored
    /// - `PinNotSet` when the profile has no PIN
    /// - `InvalidPin` on mismatch
    pub async fn unlock_with_pin(&self, pin: &str) -> SyncResult<LocalAuth> {
        let mut stored = self.db.auth().get().await?.ok_or(SyncError::NotAuthenticated)?;
        let hash = stored.pin_hash.as_deref().ok_or(SyncError::PinNotSet)?;

        if !verify_pin(pin, hash) {
            warn!(user_id = %stored.user_id, "Offline unlock rejected");
            return Err(SyncError::InvalidPin);
        }

        let now = Utc::now();
        self.db.auth().touch_login(now).await?;
        stored.last_login_at = now;

        info!(user_id = %stored.user_id, "Unlocked offline");
        self.user_tx.send_replace(Some(stored.clone()));
        Ok(stored)
    }

    /// Forgets the stored profile. Local events and sessions stay.
    pub async fn sign_out(&self) -> SyncResult<()> {
        self.db.auth().clear().await?;
        self.user_tx.send_replace(None);
        info!("Signed out");
        Ok(())
    }
}

// =============================================================================
// PIN Hashing
// =============================================================================

fn validate_pin(pin: &str) -> SyncResult<()> {
    if pin.len() < PIN_MIN_LEN || pin.len() > PIN_MAX_LEN || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "pin".into(),
            reason: format!("must be {PIN_MIN_LEN} to {PIN_MAX_LEN} digits"),
        }
        .into());
    }
    Ok(())
}

fn hash_pin(pin: &str) -> SyncResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| SyncError::PinHash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| SyncError::PinHash(e.to_string()))?;

    Ok(hash.to_string())
}

fn verify_pin(pin: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcount_db::DbConfig;

    fn profile() -> AuthProfile {
        AuthProfile {
            user_id: "user-1".into(),
            email: "ana@example.com".into(),
            name: "Ana".into(),
            role: UserRole::Operator,
            company_id: Some("company-1".into()),
        }
    }

    #[tokio::test]
    async fn test_stamp_requires_sign_in() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auth = AuthService::start(db.clone()).await.unwrap();
        let identity = auth.identity();

        assert!(matches!(identity.stamp(), Err(SyncError::NotAuthenticated)));

        auth.sign_in(profile()).await.unwrap();
        let stamp = identity.stamp().unwrap();
        assert_eq!(stamp.user_id, "user-1");
        assert_eq!(stamp.company_id, "company-1");
        assert_eq!(stamp.device_id, db.device().device_id().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_company_falls_back_to_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auth = AuthService::start(db).await.unwrap();

        let mut p = profile();
        p.company_id = None;
        let stored = auth.sign_in(p).await.unwrap();
        assert_eq!(stored.company_id, DEFAULT_COMPANY_ID);
    }

    #[tokio::test]
    async fn test_pin_unlock_flow() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auth = AuthService::start(db.clone()).await.unwrap();

        auth.sign_in(profile()).await.unwrap();
        assert!(auth.set_pin("12ab").await.unwrap_err().is_validation());
        auth.set_pin("1234").await.unwrap();

        let stored = db.auth().get().await.unwrap().unwrap();
        assert_ne!(stored.pin_hash.as_deref(), Some("1234"));

        // App restart: a fresh service starts signed out.
        let restarted = AuthService::start(db.clone()).await.unwrap();
        assert!(!restarted.identity().is_authenticated());

        assert!(matches!(restarted.unlock_with_pin("9999").await, Err(SyncError::InvalidPin)));
        let user = restarted.unlock_with_pin("1234").await.unwrap();
        assert_eq!(user.user_id, "user-1");
        assert!(restarted.identity().is_authenticated());
    }

    #[tokio::test]
    async fn test_unlock_without_pin() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auth = AuthService::start(db).await.unwrap();

        assert!(matches!(auth.unlock_with_pin("1234").await, Err(SyncError::NotAuthenticated)));
        auth.sign_in(profile()).await.unwrap();
        assert!(matches!(auth.unlock_with_pin("1234").await, Err(SyncError::PinNotSet)));
    }

    #[tokio::test]
    async fn test_sign_out_keeps_events_and_device_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auth = AuthService::start(db.clone()).await.unwrap();
        let device_id = auth.identity().device_id().to_string();

        auth.sign_in(profile()).await.unwrap();
        auth.sign_out().await.unwrap();

        assert!(!auth.identity().is_authenticated());
        assert!(db.auth().get().await.unwrap().is_none());
        assert_eq!(db.device().device_id().await.unwrap(), device_id);
    }
}
