//! Key lifecycle management for Keywarden.
//!
//! This crate owns the local record of every issued key and the rules for
//! keeping it consistent with the remote authority:
//! - `RecordStore` — the flat-file document holding every `KeyRecord`
//! - `ExpiryScheduler` — one in-process fire-once timer per temporary key
//! - `LifecycleManager` — the single component allowed to mutate the store;
//!   orchestrates issuance, revocation, reaping, queries and stats
//! - `NotificationSink` — best-effort delivery of lifecycle events
//!
//! # Design Principles
//!
//! - **Remote authority of record**: a record exists locally only after the
//!   authority confirmed issuance; existence is never decided locally
//! - **Serialized mutation**: every load-mutate-save sequence runs under one
//!   write lock, so scheduled reaps and manual deletes cannot lose updates
//! - **Durable before done**: the store is flushed before an operation that
//!   mutated it reports success
//! - **Reaping is retried, never fatal**: a failed revoke leaves the record
//!   in place for the next sweep

mod clock;
mod error;
mod manager;
mod notify;
mod scheduler;
mod stats;
mod store;

pub use clock::{mock as clock_mock, Clock, SystemClock};
pub use error::{LifecycleError, LifecycleResult};
pub use manager::{
    IssuedKey, KeyTimeReport, LifecycleConfig, LifecycleManager, ReapOutcome,
};
pub use notify::{
    mock as notify_mock, NoopSink, NotificationSink, NotifyError, WebhookConfig, WebhookSink,
};
pub use scheduler::{ExpiryHandler, ExpiryScheduler};
pub use stats::{compute_stats, KeyFilter};
pub use store::RecordStore;
