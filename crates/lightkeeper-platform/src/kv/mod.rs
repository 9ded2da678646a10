//! Key-value storage abstraction.
//!
//! All durable lightkeeper state lives behind [`KvStore`]. Values are JSON
//! strings; the typed helpers on `dyn KvStore` do the encoding. Backends
//! must make [`KvStore::set_nx`], [`KvStore::incr_with_ttl`] and
//! [`KvStore::apply_batch`] atomic; everything built on top relies on it.

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use lightkeeper_types::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::MemoryKvStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisKvStore;

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    /// Store `value`, replacing any previous value and TTL.
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// Remove `key` if present.
    Delete { key: String },
}

impl KvWrite {
    /// A `Set` of `value` encoded as JSON.
    pub fn set_json<T: Serialize + ?Sized>(
        key: impl Into<String>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<Self, StorageError> {
        Ok(Self::Set {
            key: key.into(),
            value: serde_json::to_string(value)?,
            ttl,
        })
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// The key this write touches.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// A key-value store with per-key TTLs.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value. `ttl = None` stores it without expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>)
    -> Result<(), StorageError>;

    /// Write only if the key is absent. Returns `true` if the write happened.
    async fn set_nx(&self, key: &str, value: String, ttl: Duration) -> Result<bool, StorageError>;

    /// Increment an integer counter, creating it at 1 with `ttl` when absent.
    /// The TTL of an existing counter is left alone.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StorageError>;

    /// Remaining lifetime of a key. `None` when the key is absent or has no
    /// expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StorageError>;

    async fn del(&self, key: &str) -> Result<(), StorageError>;

    /// Apply all writes atomically, in order.
    async fn apply_batch(&self, writes: Vec<KvWrite>) -> Result<(), StorageError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;
}

impl dyn KvStore {
    /// Read and decode a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write a JSON value.
    pub async fn set_json<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl).await
    }
}
