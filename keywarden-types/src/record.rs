//! Key lifecycle records.
//!
//! A `KeyRecord` is the locally authoritative description of one issued
//! license key: its kind, creation time, optional expiry, and the last
//! hardware-binding reset. A record exists locally only after the remote
//! authority has confirmed issuance of that key — there are no speculative
//! local-only records.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The kind of an issued key. Immutable once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Never expires; removed only by an explicit revoke.
    Permanent,
    /// Carries an expiry instant and is reaped once it passes.
    Temporary,
}

/// A locally stored description of one issued key.
///
/// Serialized with the flat-store field names (`type`, `created`,
/// `expiresAt`, `hwidReset`) so an existing `keys.json` loads unchanged.
/// Unknown fields in the document are dropped on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Opaque identifier assigned by the remote authority, never generated
    /// locally.
    pub key: String,

    /// Permanent or temporary.
    #[serde(rename = "type")]
    pub kind: KeyKind,

    /// Issuance time.
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,

    /// Expiry instant; present iff the key is temporary, and never changes
    /// once set.
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Last successful hardware-binding reset. Overwritten on each reset.
    #[serde(rename = "hwidReset", default)]
    pub hwid_reset_at: Option<DateTime<Utc>>,
}

impl KeyRecord {
    /// Creates a permanent record.
    #[must_use]
    pub fn permanent(key: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            kind: KeyKind::Permanent,
            created_at,
            expires_at: None,
            hwid_reset_at: None,
        }
    }

    /// Creates a temporary record expiring at the given instant.
    #[must_use]
    pub fn temporary(
        key: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            kind: KeyKind::Temporary,
            created_at,
            expires_at: Some(expires_at),
            hwid_reset_at: None,
        }
    }

    /// Checks the kind/expiry invariant: permanent records carry no expiry,
    /// temporary records always carry one.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` when the invariant is violated.
    pub fn validate(&self) -> Result<()> {
        match (self.kind, self.expires_at) {
            (KeyKind::Permanent, Some(_)) => Err(Error::InvalidRecord(format!(
                "permanent key {} must not carry an expiry",
                self.key
            ))),
            (KeyKind::Temporary, None) => Err(Error::InvalidRecord(format!(
                "temporary key {} is missing its expiry",
                self.key
            ))),
            _ => Ok(()),
        }
    }

    /// Returns true if the record is temporary and past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Returns true if the record is permanent or not yet expired at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }

    /// Time left until expiry at `now`, clamped at zero.
    /// `None` for permanent records.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| (expires_at - now).max(Duration::zero()))
    }
}
