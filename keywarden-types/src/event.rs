//! Notification events emitted after authoritative state changes.
//!
//! Events are delivered to a notification sink on a best-effort basis —
//! they never gate the operation that produced them. Each event is
//! immutable and carries everything a sink needs to render it.

use crate::{KeyKind, KeyStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The payload of a notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum KeyEventPayload {
    /// A key was issued and recorded locally.
    KeyIssued {
        key: String,
        kind: KeyKind,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    },

    /// A key was explicitly revoked and its record removed.
    KeyRevoked {
        key: String,
        /// Who asked for the revocation (e.g. "operator").
        by: String,
    },

    /// A temporary key passed its expiry and was revoked and removed.
    KeyExpiredAndReaped { key: String },

    /// A hardware-binding reset succeeded remotely.
    HwidReset { key: String, at: DateTime<Utc> },

    /// A point-in-time aggregate over the local record store.
    StatsSnapshot { stats: KeyStats },
}

/// A notification event with its identity and occurrence time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Unique identifier for this event.
    pub id: EventId,

    /// When the state change happened.
    pub occurred_at: DateTime<Utc>,

    /// What happened.
    #[serde(flatten)]
    pub payload: KeyEventPayload,
}

impl KeyEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>, payload: KeyEventPayload) -> Self {
        Self {
            id: EventId::new(),
            occurred_at,
            payload,
        }
    }

    /// Creates a key-issued event.
    #[must_use]
    pub fn issued(
        key: impl Into<String>,
        kind: KeyKind,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(
            created_at,
            KeyEventPayload::KeyIssued {
                key: key.into(),
                kind,
                created_at,
                expires_at,
            },
        )
    }

    /// Creates a key-revoked event.
    #[must_use]
    pub fn revoked(key: impl Into<String>, by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(
            at,
            KeyEventPayload::KeyRevoked {
                key: key.into(),
                by: by.into(),
            },
        )
    }

    /// Creates an expired-and-reaped event.
    #[must_use]
    pub fn reaped(key: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(at, KeyEventPayload::KeyExpiredAndReaped { key: key.into() })
    }

    /// Creates a hardware-binding reset event.
    #[must_use]
    pub fn hwid_reset(key: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(
            at,
            KeyEventPayload::HwidReset {
                key: key.into(),
                at,
            },
        )
    }

    /// Creates a stats snapshot event.
    #[must_use]
    pub fn stats_snapshot(stats: KeyStats, at: DateTime<Utc>) -> Self {
        Self::new(at, KeyEventPayload::StatsSnapshot { stats })
    }

    /// The key this event concerns, if it concerns a single key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.payload {
            KeyEventPayload::KeyIssued { key, .. }
            | KeyEventPayload::KeyRevoked { key, .. }
            | KeyEventPayload::KeyExpiredAndReaped { key }
            | KeyEventPayload::HwidReset { key, .. } => Some(key),
            KeyEventPayload::StatsSnapshot { .. } => None,
        }
    }
}
