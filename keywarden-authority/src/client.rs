//! HTTP client for the remote key authority.
//!
//! Endpoints (all relative to the configured base URL):
//! - `POST /genkey` → `{ "key": … }`
//! - `POST /deletekey` `{ "key": … }` → `{ "success": …, "message"? }`
//! - `POST /resethwid` `{ "key": … }` → `{ "success": …, "message"? }`
//! - `GET /stats` → `{ "total": …, "bound": …, "unbound": … }`

use crate::error::{AuthorityError, AuthorityResult};
use async_trait::async_trait;
use keywarden_types::RemoteStats;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP authority client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL of the authority API. Trailing slashes are ignored.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Outcome of a revocation attempt.
///
/// `NotFound` is surfaced separately from `Revoked` so the caller can
/// decide what to do with its local record — the lifecycle manager removes
/// it in both cases, treating a repeat revoke as benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The authority revoked the key.
    Revoked,
    /// The authority no longer knows the key.
    NotFound,
}

/// The four capabilities of the remote key authority.
#[async_trait]
pub trait KeyAuthority: Send + Sync {
    /// Mints one new key and returns its identifier.
    async fn issue(&self) -> AuthorityResult<String>;

    /// Revokes a key. Calling this on an already-revoked key yields
    /// `RevokeOutcome::NotFound` rather than an error.
    async fn revoke(&self, key: &str) -> AuthorityResult<RevokeOutcome>;

    /// Resets the hardware binding of a key.
    async fn reset_binding(&self, key: &str) -> AuthorityResult<()>;

    /// Fetches the authority's aggregate counts.
    async fn fetch_stats(&self) -> AuthorityResult<RemoteStats>;
}

#[derive(Debug, Serialize)]
struct KeyRequest<'a> {
    key: &'a str,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// reqwest-backed implementation of `KeyAuthority`.
pub struct HttpAuthority {
    base_url: String,
    client: Client,
}

impl HttpAuthority {
    /// Creates a client for the configured authority.
    #[must_use]
    pub fn new(config: AuthorityConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// The base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Maps a non-2xx status to the error for operations that only
    /// distinguish status class.
    fn classify(status: StatusCode, body: &str) -> AuthorityError {
        if status.is_server_error() {
            AuthorityError::Unavailable(format!("{status}: {body}"))
        } else {
            AuthorityError::Rejected(format!("{status}: {body}"))
        }
    }

    async fn error_body(response: reqwest::Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl KeyAuthority for HttpAuthority {
    async fn issue(&self) -> AuthorityResult<String> {
        let response = self
            .client
            .post(self.endpoint("genkey"))
            .send()
            .await
            .map_err(|e| AuthorityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify(status, &Self::error_body(response).await));
        }

        let body: IssueResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::Unavailable(format!("invalid response body: {e}")))?;

        debug!(key = %body.key, "issued key");
        Ok(body.key)
    }

    async fn revoke(&self, key: &str) -> AuthorityResult<RevokeOutcome> {
        let response = self
            .client
            .post(self.endpoint("deletekey"))
            .json(&KeyRequest { key })
            .send()
            .await
            .map_err(|e| AuthorityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(key, "revoke: key not known remotely");
            return Ok(RevokeOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(Self::classify(status, &Self::error_body(response).await));
        }

        let body: AckResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::Unavailable(format!("invalid response body: {e}")))?;

        if body.success {
            debug!(key, "revoked key");
            Ok(RevokeOutcome::Revoked)
        } else {
            Err(AuthorityError::Rejected(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    async fn reset_binding(&self, key: &str) -> AuthorityResult<()> {
        let response = self
            .client
            .post(self.endpoint("resethwid"))
            .json(&KeyRequest { key })
            .send()
            .await
            .map_err(|e| AuthorityError::Unavailable(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Err(AuthorityError::NotFound),
            StatusCode::BAD_REQUEST => {
                return Err(AuthorityError::InvalidKey(
                    Self::error_body(response).await,
                ));
            }
            _ if !status.is_success() => {
                return Err(Self::classify(status, &Self::error_body(response).await));
            }
            _ => {}
        }

        let body: AckResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::Unavailable(format!("invalid response body: {e}")))?;

        if body.success {
            debug!(key, "reset hardware binding");
            Ok(())
        } else {
            Err(AuthorityError::Rejected(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    async fn fetch_stats(&self) -> AuthorityResult<RemoteStats> {
        let response = self
            .client
            .get(self.endpoint("stats"))
            .send()
            .await
            .map_err(|e| AuthorityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify(status, &Self::error_body(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| AuthorityError::Unavailable(format!("invalid response body: {e}")))
    }
}

/// An in-memory authority for testing.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Scriptable mock authority.
    ///
    /// By default every call succeeds: `issue` hands out sequential
    /// `KEY-0001`-style identifiers, `revoke` reports `Revoked`,
    /// `reset_binding` succeeds and `fetch_stats` returns zeroes. Queue
    /// explicit results to script failures; queued results are consumed
    /// before the defaults.
    #[derive(Default)]
    pub struct MockAuthority {
        issue_counter: AtomicU64,
        issue_results: Mutex<VecDeque<AuthorityResult<String>>>,
        revoke_results: Mutex<VecDeque<AuthorityResult<RevokeOutcome>>>,
        reset_results: Mutex<VecDeque<AuthorityResult<()>>>,
        stats_results: Mutex<VecDeque<AuthorityResult<RemoteStats>>>,
        issued: Mutex<Vec<String>>,
        revoked: Mutex<Vec<String>>,
        resets: Mutex<Vec<String>>,
    }

    impl MockAuthority {
        /// Creates a mock where every call succeeds.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues the result of the next `issue` call.
        pub fn push_issue_result(&self, result: AuthorityResult<String>) {
            self.issue_results.lock().unwrap().push_back(result);
        }

        /// Queues the result of the next `revoke` call.
        pub fn push_revoke_result(&self, result: AuthorityResult<RevokeOutcome>) {
            self.revoke_results.lock().unwrap().push_back(result);
        }

        /// Queues the result of the next `reset_binding` call.
        pub fn push_reset_result(&self, result: AuthorityResult<()>) {
            self.reset_results.lock().unwrap().push_back(result);
        }

        /// Queues the result of the next `fetch_stats` call.
        pub fn push_stats_result(&self, result: AuthorityResult<RemoteStats>) {
            self.stats_results.lock().unwrap().push_back(result);
        }

        /// Keys handed out so far.
        #[must_use]
        pub fn issued(&self) -> Vec<String> {
            self.issued.lock().unwrap().clone()
        }

        /// Keys passed to `revoke` so far, in call order.
        #[must_use]
        pub fn revoked(&self) -> Vec<String> {
            self.revoked.lock().unwrap().clone()
        }

        /// Keys passed to `reset_binding` so far.
        #[must_use]
        pub fn resets(&self) -> Vec<String> {
            self.resets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KeyAuthority for MockAuthority {
        async fn issue(&self) -> AuthorityResult<String> {
            let result = self
                .issue_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    let n = self.issue_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(format!("KEY-{n:04}"))
                });
            if let Ok(key) = &result {
                self.issued.lock().unwrap().push(key.clone());
            }
            result
        }

        async fn revoke(&self, key: &str) -> AuthorityResult<RevokeOutcome> {
            self.revoked.lock().unwrap().push(key.to_string());
            self.revoke_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(RevokeOutcome::Revoked))
        }

        async fn reset_binding(&self, key: &str) -> AuthorityResult<()> {
            self.resets.lock().unwrap().push(key.to_string());
            self.reset_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn fetch_stats(&self) -> AuthorityResult<RemoteStats> {
            self.stats_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(RemoteStats::default()))
        }
    }
}
