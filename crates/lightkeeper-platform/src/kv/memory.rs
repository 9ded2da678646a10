//! In-process [`KvStore`].
//!
//! Expiry is evaluated against the injected [`Clock`], so tests can expire
//! keys by advancing a [`ManualClock`](crate::clock::ManualClock). Every
//! operation holds one mutex for its whole duration, which is what makes
//! `set_nx`, `incr_with_ttl` and `apply_batch` atomic.
//!
//! Expired keys are dropped when read, and in a full sweep every
//! `SWEEP_EVERY` writes. Nonces and rate-limit counters are written once
//! per key and never read again, so the sweep is what bounds the map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lightkeeper_types::StorageError;
use parking_lot::Mutex;

use super::{KvStore, KvWrite};
use crate::clock::{Clock, SystemClock};

/// Writes between full sweeps of expired entries.
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    writes: u64,
}

impl Inner {
    /// Look up a live entry, dropping it if it has expired.
    fn live(&mut self, key: &str, now: DateTime<Utc>) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|e| !e.is_live(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn insert(&mut self, key: String, entry: Entry, now: DateTime<Utc>) {
        self.writes += 1;
        if self.writes % SWEEP_EVERY == 0 {
            let before = self.entries.len();
            self.entries.retain(|_, e| e.is_live(now));
            let swept = before - self.entries.len();
            if swept > 0 {
                tracing::debug!(swept, remaining = self.entries.len(), "swept expired keys");
            }
        }
        self.entries.insert(key, entry);
    }
}

/// A [`KvStore`] backed by a `HashMap`.
pub struct MemoryKvStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.inner
            .lock()
            .entries
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held in memory, expired or not.
    pub fn stored_len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Keys starting with `prefix`, sorted. Test and debugging aid.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .inner
            .lock()
            .entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn expiry(&self, now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
        ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        Ok(inner.live(key, now).map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, ttl);
        self.inner
            .lock()
            .insert(key.to_owned(), Entry { value, expires_at }, now);
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: String, ttl: Duration) -> Result<bool, StorageError> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, Some(ttl));
        let mut inner = self.inner.lock();
        if inner.live(key, now).is_some() {
            return Ok(false);
        }
        inner.insert(key.to_owned(), Entry { value, expires_at }, now);
        Ok(true)
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StorageError> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, Some(ttl));
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.live(key, now) {
            let current: i64 = entry.value.parse().map_err(|_| {
                StorageError::Backend(format!("value at {key} is not an integer"))
            })?;
            let next = current + 1;
            entry.value = next.to_string();
            return Ok(next);
        }
        inner.insert(
            key.to_owned(),
            Entry {
                value: "1".into(),
                expires_at,
            },
            now,
        );
        Ok(1)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StorageError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        Ok(inner
            .live(key, now)
            .and_then(|e| e.expires_at)
            .and_then(|at| (at - now).to_std().ok()))
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        self.inner.lock().entries.remove(key);
        Ok(())
    }

    async fn apply_batch(&self, writes: Vec<KvWrite>) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        for write in writes {
            match write {
                KvWrite::Set { key, value, ttl } => {
                    let expires_at = self.expiry(now, ttl);
                    inner.insert(key, Entry { value, expires_at }, now);
                }
                KvWrite::Delete { key } => {
                    inner.entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
