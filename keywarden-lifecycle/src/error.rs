//! Error types for lifecycle operations.

use keywarden_authority::AuthorityError;
use thiserror::Error;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors surfaced by the lifecycle manager.
///
/// Validation errors are raised before any remote call; remote errors keep
/// their kind so an adapter can map them to user-facing responses. Corrupt
/// store reads are recovered locally (empty store, logged) and never appear
/// here — only write failures do.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Requested amount outside the allowed batch range.
    #[error("amount must be between 1 and {max} keys, got {got}")]
    InvalidAmount { got: u32, max: u32 },

    /// Requested TTL outside the allowed range.
    #[error("time must be between 1 and {max} minutes, got {got}")]
    InvalidTtl { got: u32, max: u32 },

    /// The key is empty or whitespace.
    #[error("a non-empty license key is required")]
    InvalidKey,

    /// The remote authority could not be reached (network or 5xx).
    #[error("remote authority unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote authority rejected the request (4xx).
    #[error("remote authority rejected the request: {0}")]
    RemoteRejected(String),

    /// The remote authority does not know the key.
    #[error("key not known to the remote authority")]
    NotFound,

    /// The record store could not be written.
    #[error("record store error: {0}")]
    Store(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AuthorityError> for LifecycleError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::Unavailable(m) => Self::RemoteUnavailable(m),
            AuthorityError::Rejected(m) => Self::RemoteRejected(m),
            AuthorityError::NotFound => Self::NotFound,
            AuthorityError::InvalidKey(m) => Self::RemoteRejected(m),
        }
    }
}
