//! Error types for remote authority calls.

use thiserror::Error;

/// Result type for authority operations.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

/// Errors surfaced by the remote authority client.
///
/// The variants follow status class: network failures and 5xx responses are
/// `Unavailable`, 4xx responses are `Rejected` (with 404 and 400 narrowed
/// to `NotFound` and `InvalidKey` where the operation distinguishes them).
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The authority could not be reached or answered with a server error.
    #[error("remote authority unavailable: {0}")]
    Unavailable(String),

    /// The authority refused the request.
    #[error("remote authority rejected the request: {0}")]
    Rejected(String),

    /// The authority does not know the key.
    #[error("key not known to the remote authority")]
    NotFound,

    /// The authority considers the key malformed or unbound.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
