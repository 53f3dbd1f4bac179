//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     STOCKCOUNT_REMOTE_URL=https://api.example.com                       │
//! │     STOCKCOUNT_API_KEY=...                                              │
//! │     STOCKCOUNT_SYNC_INTERVAL_SECS=600                                   │
//! │     STOCKCOUNT_DB_PATH=/data/stockcount.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/stockcount/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/com.stockcount.stockcount/ (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     hourly sync, 5 s pending refresh, batches of 100                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [remote]
//! base_url = "https://api.example.com"
//! api_key = "sk_live_..."
//! timeout_secs = 30
//!
//! [sync]
//! enabled = true
//! interval_secs = 3600
//! pending_refresh_secs = 5
//! batch_size = 100
//! retry_initial_backoff_secs = 5
//!
//! [database]
//! path = "/var/lib/stockcount/stockcount.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote Settings
// =============================================================================

/// Where the backend lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Backend base URL. Sync stays idle while this is unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync cadence and batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Master switch. When false the scheduler only refreshes the badge.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between periodic sync cycles (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Interval between pending-count refreshes (seconds).
    #[serde(default = "default_pending_refresh")]
    pub pending_refresh_secs: u64,

    /// Number of events sent per push request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// First retry delay after a failed cycle (seconds).
    /// Doubles on each further failure, capped at `interval_secs`.
    #[serde(default = "default_initial_backoff")]
    pub retry_initial_backoff_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_interval() -> u64 {
    3600
}
fn default_pending_refresh() -> u64 {
    5
}
fn default_batch_size() -> usize {
    100
}
fn default_initial_backoff() -> u64 {
    5
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: default_true(),
            interval_secs: default_interval(),
            pending_refresh_secs: default_pending_refresh(),
            batch_size: default_batch_size(),
            retry_initial_backoff_secs: default_initial_backoff(),
        }
    }
}

impl SyncSettings {
    /// Never shorter than one second, even for unvalidated settings.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn pending_refresh(&self) -> Duration {
        Duration::from_secs(self.pending_refresh_secs.max(1))
    }

    pub fn retry_initial_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_initial_backoff_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Location of the local store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(ref url) = self.remote.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SyncError::InvalidUrl(format!(
                    "Backend URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }

        if self.sync.interval_secs == 0 || self.sync.pending_refresh_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs and pending_refresh_secs must be greater than 0".into(),
            ));
        }

        if self.sync.retry_initial_backoff_secs > self.sync.interval_secs {
            return Err(SyncError::InvalidConfig(
                "retry_initial_backoff_secs must not exceed interval_secs".into(),
            ));
        }

        if self.remote.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("STOCKCOUNT_REMOTE_URL") {
            debug!(url = %url, "Overriding backend URL from environment");
            self.remote.base_url = Some(url);
        }

        if let Ok(key) = std::env::var("STOCKCOUNT_API_KEY") {
            self.remote.api_key = Some(key);
        }

        if let Ok(interval) = std::env::var("STOCKCOUNT_SYNC_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(secs) => {
                    debug!(secs, "Overriding sync interval from environment");
                    self.sync.interval_secs = secs;
                }
                Err(_) => warn!(value = %interval, "Ignoring invalid STOCKCOUNT_SYNC_INTERVAL_SECS"),
            }
        }

        if let Ok(path) = std::env::var("STOCKCOUNT_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "stockcount", "stockcount")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the database file, falling back to the platform data dir.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.path.clone().or_else(|| {
            Self::project_dirs().map(|dirs| dirs.data_dir().join("stockcount.db"))
        })
    }

    /// Returns true if sync is enabled and a backend is configured.
    pub fn is_sync_enabled(&self) -> bool {
        self.sync.enabled && self.remote.base_url.is_some()
    }

    /// Returns the backend URL if configured.
    pub fn base_url(&self) -> Option<&str> {
        self.remote.base_url.as_deref()
    }
}
