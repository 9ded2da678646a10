//! Read-through TTL caches for third-party lookups.
//!
//! Each cache stores one value per normalized identifier under a fixed
//! prefix. There is no index; entries simply expire. Competitor keywords
//! and domain pages are keyed by lower-cased domain, keyword ideas by a
//! slug of the seed phrase.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use lightkeeper_platform::KvStore;
use lightkeeper_types::Result;
use lightkeeper_types::config::CacheTtlConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::keys;

/// Turns a caller-supplied identifier into the key suffix.
pub type Normalizer = fn(&str) -> String;

pub struct TtlCache<T> {
    kv: Arc<dyn KvStore>,
    prefix: &'static str,
    ttl: Duration,
    normalize: Normalizer,
    _value: PhantomData<fn() -> T>,
}

impl<T> TtlCache<T>
where
    T: Serialize + DeserializeOwned + Sync,
{
    pub fn new(
        kv: Arc<dyn KvStore>,
        prefix: &'static str,
        ttl: Duration,
        normalize: Normalizer,
    ) -> Self {
        Self {
            kv,
            prefix,
            ttl,
            normalize,
            _value: PhantomData,
        }
    }

    /// Store key for `id`.
    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, (self.normalize)(id))
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.kv.get_json(&self.key(id)).await?)
    }

    pub async fn set(&self, id: &str, value: &T) -> Result<()> {
        self.kv
            .set_json(&self.key(id), value, Some(self.ttl))
            .await?;
        Ok(())
    }

    /// Return the cached value, or call `fetch` and cache what it returns.
    ///
    /// Cache failures are logged and never fail the lookup: a read error
    /// falls through to `fetch`, a write error still returns the fetched
    /// value. Errors from `fetch` are returned unchanged and nothing is
    /// cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, id: &str, fetch: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.key(id);
        match self.kv.get_json::<T>(&key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "cache read failed, fetching"),
        }

        let value = fetch().await?;
        if let Err(e) = self.kv.set_json(&key, &value, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
        Ok(value)
    }
}

/// Ranked keywords per competitor domain.
pub fn competitor_keywords<T>(kv: Arc<dyn KvStore>, ttls: &CacheTtlConfig) -> TtlCache<T>
where
    T: Serialize + DeserializeOwned + Sync,
{
    TtlCache::new(
        kv,
        keys::COMPETITOR_KEYWORDS_PREFIX,
        Duration::from_secs(ttls.competitor_keywords_secs),
        normalize_domain,
    )
}

/// Top-page summaries per domain.
pub fn domain_pages<T>(kv: Arc<dyn KvStore>, ttls: &CacheTtlConfig) -> TtlCache<T>
where
    T: Serialize + DeserializeOwned + Sync,
{
    TtlCache::new(
        kv,
        keys::DOMAIN_PAGES_PREFIX,
        Duration::from_secs(ttls.domain_pages_secs),
        normalize_domain,
    )
}

/// Keyword ideas per seed phrase.
pub fn keyword_ideas<T>(kv: Arc<dyn KvStore>, ttls: &CacheTtlConfig) -> TtlCache<T>
where
    T: Serialize + DeserializeOwned + Sync,
{
    TtlCache::new(
        kv,
        keys::KEYWORD_IDEAS_PREFIX,
        Duration::from_secs(ttls.keyword_ideas_secs),
        slugify,
    )
}

/// `" Example.COM "` → `"example.com"`.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_lowercase()
}

/// Lower-case, with each whitespace run replaced by `-`.
pub fn slugify(phrase: &str) -> String {
    phrase
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lightkeeper_platform::{ManualClock, MemoryKvStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<ManualClock>, Arc<dyn KvStore>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        ));
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new(clock.clone()));
        (clock, kv)
    }

    #[test]
    fn normalizers() {
        assert_eq!(normalize_domain("  Rival.COM "), "rival.com");
        assert_eq!(slugify("Core  Web\tVitals"), "core-web-vitals");
        assert_eq!(slugify("seo"), "seo");
    }

    #[tokio::test]
    async fn keys_use_prefix_and_normalized_id() {
        let (_clock, kv) = setup();
        let ttls = CacheTtlConfig::default();
        let kw = competitor_keywords::<Vec<String>>(kv.clone(), &ttls);
        let ideas = keyword_ideas::<Vec<String>>(kv, &ttls);
        assert_eq!(kw.key("Rival.com"), "competitor:keywords:rival.com");
        assert_eq!(ideas.key("Site Speed"), "competitor:ideas:site-speed");
    }

    #[tokio::test]
    async fn get_set_and_expiry() {
        let (clock, kv) = setup();
        let pages = domain_pages::<Vec<String>>(kv, &CacheTtlConfig::default());

        assert!(pages.get("rival.com").await.unwrap().is_none());
        pages.set("RIVAL.com", &vec!["/".into()]).await.unwrap();
        assert_eq!(
            pages.get("rival.com").await.unwrap(),
            Some(vec!["/".to_string()])
        );

        clock.advance(chrono::Duration::hours(4) + chrono::Duration::seconds(1));
        assert!(pages.get("rival.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_or_fetch_caches_hits() {
        let (_clock, kv) = setup();
        let ideas = keyword_ideas::<Vec<String>>(kv, &CacheTtlConfig::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = ideas
                .get_or_fetch("site speed", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec!["lighthouse score".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(value, vec!["lighthouse score".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let (_clock, kv) = setup();
        let ideas = keyword_ideas::<Vec<String>>(kv, &CacheTtlConfig::default());

        let err = ideas
            .get_or_fetch("seo", || async { Err::<Vec<String>, _>("upstream down") })
            .await
            .unwrap_err();
        assert_eq!(err, "upstream down");
        assert!(ideas.get("seo").await.unwrap().is_none());
    }
}
