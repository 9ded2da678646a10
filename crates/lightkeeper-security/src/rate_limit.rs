//! Fixed-window rate limiting.
//!
//! The first request of a window creates the counter at 1 with the window
//! as its TTL, in one atomic store call; later requests increment it. The
//! counter is never reset mid-window, only by expiry. A caller can
//! therefore get up to `2 * limit` requests through across a window
//! boundary.
//!
//! Storage errors fail open: the request is allowed and the error logged,
//! so a store outage cannot lock CI out of uploading.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lightkeeper_platform::{Clock, KvStore};
use serde::Serialize;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// When the current window ends. Never in the past.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitResult {
    /// Whole seconds until [`reset_at`](Self::reset_at), rounded up.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000)
    }
}

pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    prefix: String,
}

impl RateLimiter {
    /// `prefix` namespaces the counters, e.g. `ratelimit:upload`.
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, prefix: impl Into<String>) -> Self {
        Self {
            kv,
            clock,
            prefix: prefix.into(),
        }
    }

    /// Count one request from `identity` against `limit` per `window_secs`.
    pub async fn check(&self, identity: &str, limit: u32, window_secs: u64) -> RateLimitResult {
        let key = format!("{}:{identity}", self.prefix);
        let window = Duration::from_secs(window_secs);
        let now = self.clock.now();
        let fallback_reset = now + chrono::Duration::seconds(window_secs as i64);

        let count = match self.kv.incr_with_ttl(&key, window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "rate limit check failed, allowing request");
                return RateLimitResult {
                    allowed: true,
                    limit,
                    remaining: limit,
                    reset_at: fallback_reset,
                };
            }
        };

        let reset_at = match self.kv.ttl(&key).await {
            Ok(Some(ttl)) => chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(fallback_reset),
            Ok(None) => fallback_reset,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "rate limit ttl lookup failed");
                fallback_reset
            }
        };

        let allowed = count <= i64::from(limit);
        let remaining = if allowed {
            u32::try_from(i64::from(limit) - count).unwrap_or(0)
        } else {
            0
        };
        if !allowed {
            tracing::warn!(identity = %identity, count, limit, "rate limit exceeded");
        }

        RateLimitResult {
            allowed,
            limit,
            remaining,
            reset_at,
        }
    }
}
