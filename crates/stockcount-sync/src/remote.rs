//! # Remote Backend
//!
//! The request/response service events are pushed to and reference data is
//! pulled from.
//!
//! ## Transport
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       HttpRemote Request                                │
//! │                                                                         │
//! │  POST {base_url}/rpc/{name}                                             │
//! │  Authorization: Bearer {api_key}                                        │
//! │  Content-Type: application/json                                         │
//! │                                                                         │
//! │  2xx + JSON body   → decoded response                                   │
//! │  2xx + bad body    → SyncError::DeserializationFailed                   │
//! │  non-2xx           → SyncError::Http { status, body }                   │
//! │  no answer         → SyncError::Transport / SyncError::Timeout          │
//! │                                                                         │
//! │  Every failure is retryable: the engine records it on the affected      │
//! │  rows and tries again next cycle.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use stockcount_core::{CountSession, InventoryEvent, Product};

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    CloseSessionRequest, CloseSessionResponse, CreateSessionRequest, CreateSessionResponse,
    GetReportRequest, PullRequest, PullResponse, PushEventsRequest, PushEventsResponse,
    RemoteReport, UpsertProductsRequest, UpsertProductsResponse,
};

// =============================================================================
// Backend Trait
// =============================================================================

/// Operations the sync engine needs from the backend.
///
/// Every write is keyed by a client-generated id and must be idempotent on
/// the backend side.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Stores events; returns the ids that are now stored remotely.
    async fn push_events(
        &self,
        device_id: &str,
        events: &[InventoryEvent],
    ) -> SyncResult<PushEventsResponse>;

    /// Reference data changed since `since` (everything when `None`).
    async fn pull(&self, device_id: &str, since: Option<DateTime<Utc>>) -> SyncResult<PullResponse>;

    /// Creates the session under its client id; returns the stored id.
    async fn create_session(&self, session: &CountSession) -> SyncResult<String>;

    async fn close_session(&self, session_id: &str, closed_at: Option<DateTime<Utc>>) -> SyncResult<()>;

    /// Upserts products; returns the accepted ids.
    async fn upsert_products(&self, products: &[Product]) -> SyncResult<Vec<String>>;

    async fn get_report(&self, session_id: &str) -> SyncResult<RemoteReport>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// JSON RPC client for the backend.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Builds a client from `[remote]` settings.
    ///
    /// ## Errors
    /// `SyncError::InvalidConfig` when no base URL is configured.
    pub fn new(settings: &RemoteSettings) -> SyncResult<Self> {
        let base_url = settings
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SyncError::InvalidConfig("remote.base_url is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpRemote {
            base_url,
            api_key: settings.api_key.clone(),
            timeout_secs: settings.timeout_secs,
            client,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/rpc/{}", self.base_url, name)
    }

    async fn call<Req, Resp>(&self, name: &str, body: &Req) -> SyncResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(name);
        debug!(url = %url, "Calling backend");

        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Http { status, message });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::DeserializationFailed(format!("{name}: {e}")))
    }

    fn map_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout_secs)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl RemoteBackend for HttpRemote {
    async fn push_events(
        &self,
        device_id: &str,
        events: &[InventoryEvent],
    ) -> SyncResult<PushEventsResponse> {
        let body = PushEventsRequest {
            device_id: device_id.to_string(),
            events: events.to_vec(),
        };
        self.call("push_events", &body).await
    }

    async fn pull(&self, device_id: &str, since: Option<DateTime<Utc>>) -> SyncResult<PullResponse> {
        let body = PullRequest {
            device_id: device_id.to_string(),
            since,
        };
        self.call("pull", &body).await
    }

    async fn create_session(&self, session: &CountSession) -> SyncResult<String> {
        let body = CreateSessionRequest {
            session: session.clone(),
        };
        let response: CreateSessionResponse = self.call("create_session", &body).await?;
        Ok(response.session_id)
    }

    async fn close_session(&self, session_id: &str, closed_at: Option<DateTime<Utc>>) -> SyncResult<()> {
        let body = CloseSessionRequest {
            session_id: session_id.to_string(),
            closed_at,
        };
        let response: CloseSessionResponse = self.call("close_session", &body).await?;
        if !response.ok {
            return Err(SyncError::Http {
                status: 200,
                message: format!("close_session rejected for {session_id}"),
            });
        }
        Ok(())
    }

    async fn upsert_products(&self, products: &[Product]) -> SyncResult<Vec<String>> {
        let body = UpsertProductsRequest {
            products: products.to_vec(),
        };
        let response: UpsertProductsResponse = self.call("upsert_products", &body).await?;
        Ok(response.accepted_ids)
    }

    async fn get_report(&self, session_id: &str) -> SyncResult<RemoteReport> {
        let body = GetReportRequest {
            session_id: session_id.to_string(),
        };
        self.call("get_report", &body).await
    }
}

// =============================================================================
// Scripted Backend (tests)
// =============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// How the mock answers `push_events`.
    #[derive(Debug, Clone)]
    pub enum PushBehavior {
        AcceptAll,
        /// Acknowledge only these ids.
        AcceptOnly(HashSet<String>),
        Fail(String),
    }

    /// In-memory backend that records every call.
    pub struct MockRemote {
        push: Mutex<PushBehavior>,
        pull_error: Mutex<Option<String>>,
        reference_error: Mutex<Option<String>>,
        pull_response: Mutex<Option<PullResponse>>,
        push_delay: Mutex<Option<Duration>>,
        pub pushed: Mutex<Vec<Vec<String>>>,
        pub pulls: Mutex<Vec<Option<DateTime<Utc>>>>,
        pub created_sessions: Mutex<Vec<String>>,
        pub closed_sessions: Mutex<Vec<String>>,
        pub upserted_products: Mutex<Vec<String>>,
    }

    impl MockRemote {
        pub fn new() -> Self {
            MockRemote {
                push: Mutex::new(PushBehavior::AcceptAll),
                pull_error: Mutex::new(None),
                reference_error: Mutex::new(None),
                pull_response: Mutex::new(None),
                push_delay: Mutex::new(None),
                pushed: Mutex::new(Vec::new()),
                pulls: Mutex::new(Vec::new()),
                created_sessions: Mutex::new(Vec::new()),
                closed_sessions: Mutex::new(Vec::new()),
                upserted_products: Mutex::new(Vec::new()),
            }
        }

        pub fn set_push(&self, behavior: PushBehavior) {
            *self.push.lock().unwrap() = behavior;
        }

        pub fn fail_pull(&self, message: Option<&str>) {
            *self.pull_error.lock().unwrap() = message.map(str::to_string);
        }

        /// Makes session and product pushes fail.
        pub fn fail_reference_push(&self, message: Option<&str>) {
            *self.reference_error.lock().unwrap() = message.map(str::to_string);
        }

        pub fn set_pull_response(&self, response: PullResponse) {
            *self.pull_response.lock().unwrap() = Some(response);
        }

        pub fn set_push_delay(&self, delay: Duration) {
            *self.push_delay.lock().unwrap() = Some(delay);
        }

        pub fn push_calls(&self) -> usize {
            self.pushed.lock().unwrap().len()
        }

        pub fn pushed_ids(&self) -> Vec<String> {
            self.pushed.lock().unwrap().iter().flatten().cloned().collect()
        }

        pub fn pull_calls(&self) -> usize {
            self.pulls.lock().unwrap().len()
        }

        fn reference_error(&self) -> SyncResult<()> {
            let error = self.reference_error.lock().unwrap().clone();
            match error {
                Some(message) => Err(SyncError::Transport(message)),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RemoteBackend for MockRemote {
        async fn push_events(
            &self,
            _device_id: &str,
            events: &[InventoryEvent],
        ) -> SyncResult<PushEventsResponse> {
            let delay = *self.push_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.pushed
                .lock()
                .unwrap()
                .push(events.iter().map(|e| e.id.clone()).collect());

            let behavior = self.push.lock().unwrap().clone();
            let accepted_ids = match behavior {
                PushBehavior::AcceptAll => events.iter().map(|e| e.id.clone()).collect(),
                PushBehavior::AcceptOnly(ids) => events
                    .iter()
                    .filter(|e| ids.contains(&e.id))
                    .map(|e| e.id.clone())
                    .collect(),
                PushBehavior::Fail(message) => return Err(SyncError::Transport(message)),
            };

            Ok(PushEventsResponse {
                accepted_ids,
                server_time: Utc::now(),
            })
        }

        async fn pull(&self, _device_id: &str, since: Option<DateTime<Utc>>) -> SyncResult<PullResponse> {
            self.pulls.lock().unwrap().push(since);

            let error = self.pull_error.lock().unwrap().clone();
            if let Some(message) = error {
                return Err(SyncError::Transport(message));
            }

            let response = self.pull_response.lock().unwrap().clone();
            Ok(response.unwrap_or_else(|| PullResponse::empty(Utc::now())))
        }

        async fn create_session(&self, session: &CountSession) -> SyncResult<String> {
            self.reference_error()?;
            self.created_sessions.lock().unwrap().push(session.id.clone());
            Ok(session.id.clone())
        }

        async fn close_session(&self, session_id: &str, _closed_at: Option<DateTime<Utc>>) -> SyncResult<()> {
            self.reference_error()?;
            self.closed_sessions.lock().unwrap().push(session_id.to_string());
            Ok(())
        }

        async fn upsert_products(&self, products: &[Product]) -> SyncResult<Vec<String>> {
            self.reference_error()?;
            let ids: Vec<String> = products.iter().map(|p| p.id.clone()).collect();
            self.upserted_products.lock().unwrap().extend(ids.iter().cloned());
            Ok(ids)
        }

        async fn get_report(&self, session_id: &str) -> SyncResult<RemoteReport> {
            Ok(RemoteReport {
                session_id: session_id.to_string(),
                items: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_remote_requires_base_url() {
        let settings = RemoteSettings::default();
        assert!(matches!(HttpRemote::new(&settings), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let settings = RemoteSettings {
            base_url: Some("https://api.example.com/".into()),
            ..Default::default()
        };
        let remote = HttpRemote::new(&settings).unwrap();
        assert_eq!(remote.endpoint("pull"), "https://api.example.com/rpc/pull");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_retryable() {
        let settings = RemoteSettings {
            base_url: Some("http://127.0.0.1:9".into()),
            api_key: Some("key".into()),
            timeout_secs: 2,
        };
        let remote = HttpRemote::new(&settings).unwrap();

        let err = remote.pull("device", None).await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err:?}");
    }
}
