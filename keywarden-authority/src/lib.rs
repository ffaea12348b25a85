//! Remote key authority client for Keywarden.
//!
//! The remote authority is the service of record for license keys: it
//! issues them, revokes them, resets their hardware binding, and reports
//! aggregate counts. This crate wraps those four capabilities behind the
//! `KeyAuthority` trait, with an HTTP implementation and an in-memory mock
//! for tests.
//!
//! Every call is a single round trip. There are no retries here — retry
//! policy belongs to the lifecycle manager, which re-attempts failed
//! revocations on its reconciliation sweeps.

mod client;
mod error;

pub use client::{mock, AuthorityConfig, HttpAuthority, KeyAuthority, RevokeOutcome};
pub use error::{AuthorityError, AuthorityResult};
