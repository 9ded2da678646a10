//! Replay protection ledger.
//!
//! Each nonce is recorded with a single atomic set-if-absent; a nonce is
//! accepted only by the call that created its record. The record lives
//! for the nonce TTL, which must cover the whole timestamp acceptance
//! window (`ts - tolerance` to `ts + tolerance`).

use std::sync::Arc;
use std::time::Duration;

use lightkeeper_platform::{Clock, KvStore};

/// Key prefix of nonce records.
pub const NONCE_PREFIX: &str = "nonce:";

pub struct NonceGuard {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl NonceGuard {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { kv, clock, ttl }
    }

    /// Record `nonce`. Returns `true` only if it had not been seen.
    ///
    /// Storage errors return `false`: an unverifiable nonce is treated as
    /// a replay.
    pub async fn check_and_store(&self, nonce: &str) -> bool {
        let key = format!("{NONCE_PREFIX}{nonce}");
        let first_seen = self.clock.now_millis().to_string();
        match self.kv.set_nx(&key, first_seen, self.ttl).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!(error = %e, "nonce check failed, rejecting request");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lightkeeper_platform::{ManualClock, MemoryKvStore};

    fn guard() -> (Arc<ManualClock>, NonceGuard) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        ));
        let kv = Arc::new(MemoryKvStore::new(clock.clone()));
        let guard = NonceGuard::new(kv, clock.clone(), Duration::from_secs(600));
        (clock, guard)
    }

    #[tokio::test]
    async fn first_use_accepted_replay_rejected() {
        let (_clock, guard) = guard();
        assert!(guard.check_and_store("abc").await);
        assert!(!guard.check_and_store("abc").await);
        assert!(guard.check_and_store("def").await);
    }

    #[tokio::test]
    async fn nonce_remembered_across_full_skew_window() {
        let (clock, guard) = guard();
        assert!(guard.check_and_store("abc").await);
        clock.advance(chrono::Duration::seconds(599));
        assert!(!guard.check_and_store("abc").await);
        clock.advance(chrono::Duration::seconds(2));
        assert!(guard.check_and_store("abc").await);
    }
}
