//! Error types shared across lightkeeper crates.
//!
//! [`StorageError`] describes failures of the key-value backend and is what
//! every `KvStore` implementation returns. [`KeeperError`] is the top-level
//! error for configuration and persistence operations. Both are
//! non-exhaustive so new backends can add variants.

use thiserror::Error;

/// Failure reported by a key-value backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A store call exceeded its deadline.
    #[error("store operation timed out: {operation}")]
    Timeout {
        /// Name of the store operation that timed out.
        operation: String,
    },

    /// The backend rejected the command or returned an unexpected reply.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("store codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Top-level error type for lightkeeper.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KeeperError {
    /// The key-value store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A record failed validation before it was persisted.
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// Which constraint the record violated.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KeeperError {
    /// Shorthand for [`KeeperError::ConfigInvalid`].
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }
}

/// A convenience alias used throughout lightkeeper.
pub type Result<T> = std::result::Result<T, KeeperError>;
