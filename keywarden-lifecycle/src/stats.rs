//! Read-only aggregation over record snapshots.
//!
//! Pure functions of a record slice and an instant — no caching, no side
//! effects, always consistent with the snapshot they were handed.

use chrono::{DateTime, Utc};
use keywarden_types::{KeyKind, KeyRecord, KeyStats};
use serde::{Deserialize, Serialize};

/// Filter for local record queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFilter {
    /// Every record.
    All,
    /// Permanent records only.
    Permanent,
    /// Temporary records, regardless of expiry.
    Temporary,
    /// Permanent records plus temporary records whose expiry lies ahead.
    Active,
    /// Temporary records whose expiry has passed.
    Expired,
}

impl KeyFilter {
    /// Whether `record` matches this filter at `now`.
    #[must_use]
    pub fn matches(&self, record: &KeyRecord, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Permanent => record.kind == KeyKind::Permanent,
            Self::Temporary => record.kind == KeyKind::Temporary,
            Self::Active => record.is_active(now),
            Self::Expired => record.kind == KeyKind::Temporary && record.is_expired(now),
        }
    }
}

/// Partitions a record snapshot into aggregate counts at `now`.
#[must_use]
pub fn compute_stats(records: &[KeyRecord], now: DateTime<Utc>) -> KeyStats {
    let mut stats = KeyStats {
        total: records.len() as u64,
        ..KeyStats::default()
    };

    for record in records {
        match record.kind {
            KeyKind::Permanent => {
                stats.permanent += 1;
                stats.active += 1;
            }
            KeyKind::Temporary => {
                stats.temporary += 1;
                if record.is_expired(now) {
                    stats.expired += 1;
                } else {
                    stats.active += 1;
                }
            }
        }
    }

    stats
}
