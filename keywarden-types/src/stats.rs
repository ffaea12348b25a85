//! Point-in-time aggregates over issued keys.

use serde::{Deserialize, Serialize};

/// Aggregate counts over the local record store.
///
/// `total = permanent + temporary` and `active + expired = temporary`'s
/// complement split: active counts permanent keys plus future-dated
/// temporary keys, expired counts past-dated temporary keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStats {
    /// Every locally recorded key.
    pub total: u64,
    /// Permanent keys.
    pub permanent: u64,
    /// Temporary keys, regardless of expiry.
    pub temporary: u64,
    /// Permanent keys plus temporary keys whose expiry lies in the future.
    pub active: u64,
    /// Temporary keys whose expiry has passed but are not yet reaped.
    pub expired: u64,
}

/// Aggregate counts reported by the remote authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStats {
    /// Keys known to the remote authority.
    #[serde(default)]
    pub total: u64,
    /// Keys bound to a hardware ID.
    #[serde(default)]
    pub bound: u64,
    /// Keys not yet bound.
    #[serde(default)]
    pub unbound: u64,
}

/// Local and remote aggregates joined into one view, for adapters that
/// present both sides together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedStats {
    /// Total keys as the remote authority counts them.
    pub total_keys: u64,
    pub permanent: u64,
    pub temporary: u64,
    pub active: u64,
    pub expired: u64,
    pub bound: u64,
    pub unbound: u64,
}

impl CombinedStats {
    /// Joins a local snapshot with the remote authority's counts.
    #[must_use]
    pub fn merge(local: KeyStats, remote: RemoteStats) -> Self {
        Self {
            total_keys: remote.total,
            permanent: local.permanent,
            temporary: local.temporary,
            active: local.active,
            expired: local.expired,
            bound: remote.bound,
            unbound: remote.unbound,
        }
    }
}
