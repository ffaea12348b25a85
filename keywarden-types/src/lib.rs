//! Core type definitions for Keywarden.
//!
//! This crate defines the fundamental types shared across the lifecycle
//! manager and the remote authority client:
//! - `KeyRecord` / `KeyKind` — the locally authoritative description of an
//!   issued license key
//! - `KeyStats` / `RemoteStats` / `CombinedStats` — point-in-time aggregates
//! - `KeyEvent` — structured notification events with UUID v7 identifiers
//!
//! Keys themselves are opaque strings assigned by the remote authority;
//! nothing here generates or interprets key material.

mod event;
mod record;
mod stats;

pub use event::{EventId, KeyEvent, KeyEventPayload};
pub use record::{KeyKind, KeyRecord};
pub use stats::{CombinedStats, KeyStats, RemoteStats};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
