//! Core types for the lightkeeper scan ingestion service.
//!
//! This crate holds the data model shared by every other lightkeeper crate:
//!
//! - [`report`] -- Lighthouse scan runs, the latest snapshot, and upload payloads.
//! - [`insight`] -- Cached AI analyses and their rolling history.
//! - [`competitor`] -- Competitor configuration and analysis snapshots.
//! - [`config`] -- The startup configuration schema.
//! - [`secret`] -- A redacting wrapper for signing keys and tokens.
//! - [`error`] -- Shared error types.
//!
//! It has no I/O of its own; persistence lives in `lightkeeper-core` and the
//! key-value backends in `lightkeeper-platform`.

pub mod competitor;
pub mod config;
pub mod error;
pub mod insight;
pub mod report;
pub mod secret;

pub use error::{KeeperError, Result, StorageError};
