//! In-process expiry timers for temporary keys.
//!
//! The scheduler keeps an explicit task table: at most one pending
//! revocation task per key. Tasks carry only the key string and a handler
//! reference — never request-scoped state — and fire exactly once at (or
//! after) their instant. Scheduling does not survive a restart; the
//! lifecycle manager re-registers every temporary record at startup.

use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Callback invoked when a key's expiry task fires.
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    /// Called exactly once per fired task. The handler owns its error
    /// path — the scheduler never retries on its behalf.
    async fn key_expired(&self, key: &str);
}

struct ScheduledTask {
    generation: u64,
    fire_at: DateTime<Utc>,
    handle: Option<JoinHandle<()>>,
}

/// Fire-once timer table, one pending task per key.
pub struct ExpiryScheduler {
    clock: Arc<dyn Clock>,
    tasks: Arc<Mutex<HashMap<String, ScheduledTask>>>,
    next_generation: AtomicU64,
}

impl ExpiryScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Registers a task for `key` firing at `fire_at`. An instant already
    /// in the past fires immediately. Re-scheduling a key replaces its
    /// pending task, so there is never more than one timer per key.
    pub fn schedule(&self, key: &str, fire_at: DateTime<Utc>, handler: Arc<dyn ExpiryHandler>) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let delay = (fire_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        // Register before spawning so an immediate fire finds its entry.
        let previous = self.tasks.lock().unwrap().insert(
            key.to_string(),
            ScheduledTask {
                generation,
                fire_at,
                handle: None,
            },
        );
        if let Some(task) = previous {
            if let Some(handle) = task.handle {
                handle.abort();
            }
            debug!(key, "replaced pending expiry task");
        }

        let tasks = Arc::clone(&self.tasks);
        let owned_key = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Claim the entry; if the generation moved on, a replacement
            // owns this key now and we must not fire.
            let claimed = {
                let mut tasks = tasks.lock().unwrap();
                match tasks.get(&owned_key) {
                    Some(task) if task.generation == generation => {
                        tasks.remove(&owned_key);
                        true
                    }
                    _ => false,
                }
            };

            if claimed {
                debug!(key = %owned_key, "expiry task fired");
                handler.key_expired(&owned_key).await;
            }
        });

        let mut tasks = self.tasks.lock().unwrap();
        if let Some(task) = tasks.get_mut(key) {
            if task.generation == generation {
                task.handle = Some(handle);
            }
        }
    }

    /// Removes a pending task. Safe to call for keys that were never
    /// scheduled or whose task already fired; returns whether a pending
    /// task existed.
    pub fn cancel(&self, key: &str) -> bool {
        match self.tasks.lock().unwrap().remove(key) {
            Some(task) => {
                if let Some(handle) = task.handle {
                    handle.abort();
                }
                debug!(key, "cancelled expiry task");
                true
            }
            None => false,
        }
    }

    /// Whether a task is pending for `key`.
    #[must_use]
    pub fn is_scheduled(&self, key: &str) -> bool {
        self.tasks.lock().unwrap().contains_key(key)
    }

    /// The instant the pending task for `key` will fire, if one exists.
    #[must_use]
    pub fn fire_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.tasks.lock().unwrap().get(key).map(|task| task.fire_at)
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Aborts every pending task.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for (_, task) in tasks.drain() {
            if let Some(handle) = task.handle {
                handle.abort();
            }
        }
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
