//! Platform layer for lightkeeper.
//!
//! Everything that touches the outside world sits behind a trait here so
//! the ingestion and cache logic can be tested against in-memory stand-ins:
//!
//! - [`env::Environment`] -- environment variable access.
//! - [`clock::Clock`] -- the current time.
//! - [`kv::KvStore`] -- the key-value backend holding all durable state.
//!
//! [`config_loader`] builds a validated
//! [`KeeperConfig`](lightkeeper_types::config::KeeperConfig) from a JSON
//! file plus environment overrides.

pub mod clock;
pub mod config_loader;
pub mod env;
pub mod kv;

pub use clock::{Clock, ManualClock, SystemClock};
pub use env::{Environment, MapEnvironment, NativeEnvironment};
pub use kv::{KvStore, KvWrite, MemoryKvStore};

#[cfg(feature = "redis")]
pub use kv::RedisKvStore;
