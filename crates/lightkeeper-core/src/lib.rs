//! Persistence and caching for lightkeeper.
//!
//! All state lives in a [`KvStore`](lightkeeper_platform::KvStore); the
//! types here hold no durable data of their own.
//!
//! - [`reports`] -- latest snapshot plus a bounded, newest-first run history.
//! - [`insights`] -- AI analysis cache with derived staleness, a generation
//!   lock, and a bounded history.
//! - [`aux_cache`] -- read-through TTL caches for third-party lookups.
//! - [`competitors`] -- competitor configuration and analysis snapshot.
//! - [`trends`] -- chart read model over stored runs.
//!
//! Bounded histories share one rule, implemented in [`index`]: evicting an
//! identifier from an index deletes its record in the same atomic batch.

pub mod aux_cache;
pub mod competitors;
pub mod index;
pub mod insights;
pub mod keys;
pub mod reports;
pub mod trends;

pub use aux_cache::TtlCache;
pub use competitors::CompetitorStore;
pub use insights::InsightCache;
pub use reports::ReportStore;
