//! Orchestration of the key lifecycle.
//!
//! `LifecycleManager` is the only component that mutates the record store.
//! Every mutation follows the same shape: call the remote authority first,
//! then apply the confirmed outcome to the store under the write lock, then
//! emit a notification off the request path. Reads take a snapshot and never
//! block behind mutations for longer than one load-mutate-save cycle.

use crate::clock::Clock;
use crate::error::{LifecycleError, LifecycleResult};
use crate::notify::NotificationSink;
use crate::scheduler::{ExpiryHandler, ExpiryScheduler};
use crate::stats::{compute_stats, KeyFilter};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use keywarden_authority::{KeyAuthority, RevokeOutcome};
use keywarden_types::{CombinedStats, KeyEvent, KeyKind, KeyRecord, KeyStats};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tunable limits for lifecycle operations.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Largest number of keys one issuance call may mint.
    pub max_keys_per_batch: u32,

    /// Largest TTL, in minutes, a temporary key may carry.
    pub max_ttl_minutes: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_keys_per_batch: 10,
            max_ttl_minutes: 1440,
        }
    }
}

/// One key minted by a temporary issuance, with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of one reaping sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapOutcome {
    /// Keys revoked remotely and removed locally.
    pub removed: Vec<String>,
    /// Keys whose revocation failed; their records stay for the next sweep.
    pub failed: Vec<String>,
}

/// Time left on one key, for operator-facing listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTimeReport {
    pub key: String,
    pub kind: KeyKind,
    /// `None` for permanent keys.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whole minutes left, clamped at zero. `None` for permanent keys.
    pub remaining_minutes: Option<i64>,
}

impl KeyTimeReport {
    fn for_record(record: &KeyRecord, now: DateTime<Utc>) -> Self {
        Self {
            key: record.key.clone(),
            kind: record.kind,
            expires_at: record.expires_at,
            remaining_minutes: record.remaining(now).map(|left| left.num_minutes()),
        }
    }
}

/// The single mutator of the local key record store.
pub struct LifecycleManager {
    config: LifecycleConfig,
    store: RecordStore,
    authority: Arc<dyn KeyAuthority>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    scheduler: ExpiryScheduler,
    // Serializes every load-mutate-save cycle on the store.
    write_lock: Mutex<()>,
}

impl LifecycleManager {
    /// Creates a manager over the given store and collaborators.
    ///
    /// Call [`restore_schedules`](Self::restore_schedules) afterwards to
    /// re-register expiry timers for temporary records already on disk.
    #[must_use]
    pub fn new(
        config: LifecycleConfig,
        store: RecordStore,
        authority: Arc<dyn KeyAuthority>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let scheduler = ExpiryScheduler::new(Arc::clone(&clock));
        Arc::new(Self {
            config,
            store,
            authority,
            sink,
            clock,
            scheduler,
            write_lock: Mutex::new(()),
        })
    }

    /// The expiry scheduler, exposed for inspection.
    #[must_use]
    pub fn scheduler(&self) -> &ExpiryScheduler {
        &self.scheduler
    }

    /// Registers an expiry timer for every temporary record on disk.
    ///
    /// Records whose expiry already passed are scheduled to fire
    /// immediately, so a restart does not strand expired keys.
    pub fn restore_schedules(self: &Arc<Self>) {
        let now = self.clock.now();
        let mut restored = 0usize;
        for record in self.store.load() {
            if let Some(expires_at) = record.expires_at {
                let fire_at = expires_at.max(now);
                self.scheduler
                    .schedule(&record.key, fire_at, self.handler());
                restored += 1;
            }
        }
        info!(count = restored, "restored expiry schedules");
    }

    fn handler(self: &Arc<Self>) -> Arc<dyn ExpiryHandler> {
        Arc::clone(self) as Arc<dyn ExpiryHandler>
    }

    fn check_amount(&self, count: u32) -> LifecycleResult<()> {
        if count == 0 || count > self.config.max_keys_per_batch {
            return Err(LifecycleError::InvalidAmount {
                got: count,
                max: self.config.max_keys_per_batch,
            });
        }
        Ok(())
    }

    fn check_key(key: &str) -> LifecycleResult<&str> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LifecycleError::InvalidKey);
        }
        Ok(key)
    }

    /// Appends one record under the write lock, keeping the batch's earlier
    /// keys durable even when a later step fails.
    async fn persist_record(&self, record: KeyRecord) -> LifecycleResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load();
        records.push(record);
        self.store.save(&records)
    }

    /// Removes the record for `key` under the write lock. Returns whether a
    /// record existed.
    async fn remove_record(&self, key: &str) -> LifecycleResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.store.load();
        let before = records.len();
        records.retain(|record| record.key != key);
        if records.len() == before {
            return Ok(false);
        }
        self.store.save(&records)?;
        Ok(true)
    }

    /// Delivers an event off the request path. Failures are logged and
    /// swallowed; the operation that produced the event has already
    /// committed.
    fn notify(&self, event: KeyEvent) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&event).await {
                warn!(event_id = %event.id, "dropping undeliverable event: {e}");
            }
        });
    }

    // ── Issuance ─────────────────────────────────────────────────────────

    /// Mints `count` permanent keys, recording each as it is confirmed.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any remote call, or the first
    /// remote/store failure mid-batch. Keys confirmed before the failure
    /// stay recorded.
    pub async fn issue_permanent(&self, count: u32) -> LifecycleResult<Vec<String>> {
        self.check_amount(count)?;

        let mut issued = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = self.authority.issue().await?;
            let created_at = self.clock.now();
            let record = KeyRecord::permanent(&key, created_at);
            self.persist_record(record).await?;
            self.notify(KeyEvent::issued(&key, KeyKind::Permanent, created_at, None));
            info!(key, "issued permanent key");
            issued.push(key);
        }
        Ok(issued)
    }

    /// Mints `count` temporary keys expiring `ttl_minutes` from now, and
    /// registers an expiry timer for each.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any remote call, or the first
    /// remote/store failure mid-batch. Keys confirmed before the failure
    /// stay recorded and scheduled.
    pub async fn issue_temporary(
        self: &Arc<Self>,
        ttl_minutes: u32,
        count: u32,
    ) -> LifecycleResult<Vec<IssuedKey>> {
        self.check_amount(count)?;
        if ttl_minutes == 0 || ttl_minutes > self.config.max_ttl_minutes {
            return Err(LifecycleError::InvalidTtl {
                got: ttl_minutes,
                max: self.config.max_ttl_minutes,
            });
        }

        let ttl = Duration::minutes(i64::from(ttl_minutes));
        let mut issued = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = self.authority.issue().await?;
            let created_at = self.clock.now();
            let expires_at = created_at + ttl;
            let record = KeyRecord::temporary(&key, created_at, expires_at);
            self.persist_record(record).await?;
            self.scheduler.schedule(&key, expires_at, self.handler());
            self.notify(KeyEvent::issued(
                &key,
                KeyKind::Temporary,
                created_at,
                Some(expires_at),
            ));
            info!(key, %expires_at, "issued temporary key");
            issued.push(IssuedKey { key, expires_at });
        }
        Ok(issued)
    }

    // ── Revocation and reaping ───────────────────────────────────────────

    /// Revokes a key remotely and removes its local record.
    ///
    /// Returns `true` when the authority revoked the key, `false` when the
    /// authority no longer knew it; the local record and any pending expiry
    /// timer are cleared in both cases.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank key, or the remote failure. On
    /// error the local record is left untouched, so a retry sees the same
    /// state.
    pub async fn delete_key(&self, key: &str) -> LifecycleResult<bool> {
        let key = Self::check_key(key)?;

        let outcome = self.authority.revoke(key).await?;
        let removed = self.remove_record(key).await?;
        self.scheduler.cancel(key);

        match outcome {
            RevokeOutcome::Revoked => {
                if removed {
                    self.notify(KeyEvent::revoked(key, "operator", self.clock.now()));
                }
                info!(key, "deleted key");
                Ok(true)
            }
            RevokeOutcome::NotFound => {
                debug!(key, removed, "delete: key unknown remotely");
                Ok(false)
            }
        }
    }

    /// Revokes one expired key and removes its record. Shared by the expiry
    /// timer path and the bulk sweep.
    async fn reap_one(&self, key: &str) -> LifecycleResult<bool> {
        // Revoked and NotFound both mean the key is gone remotely; either
        // way the local record no longer describes a live key.
        self.authority.revoke(key).await?;
        let removed = self.remove_record(key).await?;
        self.scheduler.cancel(key);
        if removed {
            self.notify(KeyEvent::reaped(key, self.clock.now()));
            info!(key, "reaped expired key");
        }
        Ok(removed)
    }

    /// Revokes and removes every record already past its expiry.
    ///
    /// Failures are per key: a key whose revocation fails is reported in
    /// `failed` and keeps its record for the next sweep, while the rest of
    /// the batch proceeds.
    pub async fn reap_expired(&self) -> ReapOutcome {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .store
            .load()
            .into_iter()
            .filter(|record| record.is_expired(now))
            .map(|record| record.key)
            .collect();

        let mut outcome = ReapOutcome::default();
        for key in expired {
            match self.reap_one(&key).await {
                Ok(_) => outcome.removed.push(key),
                Err(e) => {
                    warn!(key, "reap failed, record kept for next sweep: {e}");
                    outcome.failed.push(key);
                }
            }
        }
        outcome
    }

    // ── Binding reset ────────────────────────────────────────────────────

    /// Resets the hardware binding of a key remotely and stamps the reset
    /// time on the local record, when one exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a blank key, `NotFound` when the authority
    /// does not know the key, or another remote failure. The local record
    /// is only touched after remote success.
    pub async fn reset_binding(&self, key: &str) -> LifecycleResult<DateTime<Utc>> {
        let key = Self::check_key(key)?;

        self.authority.reset_binding(key).await?;
        let at = self.clock.now();

        {
            let _guard = self.write_lock.lock().await;
            let mut records = self.store.load();
            let mut stamped = false;
            for record in &mut records {
                if record.key == key {
                    record.hwid_reset_at = Some(at);
                    stamped = true;
                }
            }
            if stamped {
                self.store.save(&records)?;
            } else {
                debug!(key, "binding reset for key with no local record");
            }
        }

        self.notify(KeyEvent::hwid_reset(key, at));
        info!(key, "reset hardware binding");
        Ok(at)
    }

    // ── Queries and stats ────────────────────────────────────────────────

    /// Records matching `filter`, evaluated against one clock reading.
    #[must_use]
    pub fn query(&self, filter: KeyFilter) -> Vec<KeyRecord> {
        let now = self.clock.now();
        self.store
            .load()
            .into_iter()
            .filter(|record| filter.matches(record, now))
            .collect()
    }

    /// Time left on one key, or `None` when no record exists.
    #[must_use]
    pub fn check_time(&self, key: &str) -> Option<KeyTimeReport> {
        let now = self.clock.now();
        self.store
            .load()
            .iter()
            .find(|record| record.key == key)
            .map(|record| KeyTimeReport::for_record(record, now))
    }

    /// Time left on every recorded key, in stored order.
    #[must_use]
    pub fn time_reports(&self) -> Vec<KeyTimeReport> {
        let now = self.clock.now();
        self.store
            .load()
            .iter()
            .map(|record| KeyTimeReport::for_record(record, now))
            .collect()
    }

    /// Aggregates the local store and emits a stats snapshot event.
    #[must_use]
    pub fn compute_stats(&self) -> KeyStats {
        let now = self.clock.now();
        let stats = compute_stats(&self.store.load(), now);
        self.notify(KeyEvent::stats_snapshot(stats, now));
        stats
    }

    /// Joins the local aggregate with the remote authority's counts.
    ///
    /// # Errors
    ///
    /// Returns the remote failure when the authority's counts cannot be
    /// fetched; the local side is never the cause.
    pub async fn combined_stats(&self) -> LifecycleResult<CombinedStats> {
        let remote = self.authority.fetch_stats().await?;
        let local = compute_stats(&self.store.load(), self.clock.now());
        Ok(CombinedStats::merge(local, remote))
    }
}

#[async_trait]
impl ExpiryHandler for LifecycleManager {
    async fn key_expired(&self, key: &str) {
        if let Err(e) = self.reap_one(key).await {
            // The record stays; the next bulk sweep retries it.
            warn!(key, "scheduled reap failed: {e}");
        }
    }
}
