//! Best-effort delivery of lifecycle events.
//!
//! Sinks are fire-and-forget: the manager spawns delivery off the request
//! path and swallows failures after logging them. A sink must therefore
//! never be load-bearing — no lifecycle invariant may depend on an event
//! arriving.

use async_trait::async_trait;
use keywarden_types::{KeyEvent, KeyEventPayload, KeyKind};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Delivery failure. Informational only; the caller logs and moves on.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The event could not be handed to the downstream channel.
    #[error("event delivery failed: {0}")]
    Delivery(String),
}

/// Receiver for lifecycle events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one event. Errors are advisory; the emitting operation has
    /// already committed by the time this runs.
    async fn deliver(&self, event: &KeyEvent) -> Result<(), NotifyError>;
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn deliver(&self, _event: &KeyEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

// ── Webhook sink ─────────────────────────────────────────────────────────

/// Configuration for the webhook sink.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Webhook endpoint. Empty disables delivery.
    pub url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Posts each event as an embed payload to a webhook endpoint.
pub struct WebhookSink {
    config: WebhookConfig,
    client: Client,
}

impl WebhookSink {
    /// Creates a sink from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Delivery` when the HTTP client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }

    fn embed(event: &KeyEvent) -> Value {
        let timestamp = event.occurred_at.to_rfc3339();
        match &event.payload {
            KeyEventPayload::KeyIssued {
                key,
                kind,
                expires_at,
                ..
            } => {
                let mut fields = vec![
                    json!({ "name": "Key", "value": key, "inline": true }),
                    json!({
                        "name": "Type",
                        "value": match kind {
                            KeyKind::Permanent => "permanent",
                            KeyKind::Temporary => "temporary",
                        },
                        "inline": true,
                    }),
                ];
                if let Some(expires_at) = expires_at {
                    fields.push(json!({
                        "name": "Expires",
                        "value": expires_at.to_rfc3339(),
                        "inline": true,
                    }));
                }
                json!({
                    "title": "Key Generated",
                    "color": 0x00ff00,
                    "fields": fields,
                    "timestamp": timestamp,
                })
            }
            KeyEventPayload::KeyRevoked { key, by } => json!({
                "title": "Key Deleted",
                "color": 0xff0000,
                "fields": [
                    { "name": "Key", "value": key, "inline": true },
                    { "name": "By", "value": by, "inline": true },
                ],
                "timestamp": timestamp,
            }),
            KeyEventPayload::KeyExpiredAndReaped { key } => json!({
                "title": "Key Expired",
                "color": 0xffa500,
                "fields": [
                    { "name": "Key", "value": key, "inline": true },
                ],
                "timestamp": timestamp,
            }),
            KeyEventPayload::HwidReset { key, at } => json!({
                "title": "HWID Reset",
                "color": 0x0099ff,
                "fields": [
                    { "name": "Key", "value": key, "inline": true },
                    { "name": "At", "value": at.to_rfc3339(), "inline": true },
                ],
                "timestamp": timestamp,
            }),
            KeyEventPayload::StatsSnapshot { stats } => json!({
                "title": "Key Stats",
                "color": 0x9b59b6,
                "fields": [
                    { "name": "Total", "value": stats.total.to_string(), "inline": true },
                    { "name": "Active", "value": stats.active.to_string(), "inline": true },
                    { "name": "Expired", "value": stats.expired.to_string(), "inline": true },
                ],
                "timestamp": timestamp,
            }),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &KeyEvent) -> Result<(), NotifyError> {
        if self.config.url.is_empty() {
            debug!(event_id = %event.id, "webhook sink disabled, dropping event");
            return Ok(());
        }

        let body = json!({ "embeds": [Self::embed(event)] });
        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook returned {status}"
            )));
        }

        debug!(event_id = %event.id, "event delivered");
        Ok(())
    }
}

/// A sink that records every delivered event, for testing.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records delivered events in order; can be told to fail.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<KeyEvent>>,
        fail: Mutex<bool>,
    }

    impl RecordingSink {
        /// Creates an empty sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent delivery fail (or succeed again).
        pub fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        /// Every event delivered so far, in order.
        #[must_use]
        pub fn events(&self) -> Vec<KeyEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Number of events delivered so far.
        #[must_use]
        pub fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, event: &KeyEvent) -> Result<(), NotifyError> {
            if *self.fail.lock().unwrap() {
                return Err(NotifyError::Delivery("sink told to fail".into()));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }
}
