//! Competitor configuration and the cached competitor analysis.

use std::sync::Arc;
use std::time::Duration;

use lightkeeper_platform::{Clock, KvStore};
use lightkeeper_types::competitor::{CompetitorConfig, CompetitorConfigUpdate, CompetitorSnapshot};
use lightkeeper_types::config::CacheTtlConfig;
use lightkeeper_types::{KeeperError, Result};
use serde_json::Value;

use crate::keys;

pub const MAX_COMPETITORS: usize = 10;
pub const MAX_KEYWORDS: usize = 20;

pub struct CompetitorStore {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    data_ttl: Duration,
}

impl CompetitorStore {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, ttls: &CacheTtlConfig) -> Self {
        Self {
            kv,
            clock,
            data_ttl: Duration::from_secs(ttls.competitor_data_secs),
        }
    }

    /// The tracked competitors and keywords. Empty when never configured.
    pub async fn get_config(&self) -> Result<CompetitorConfig> {
        Ok(self
            .kv
            .get_json(keys::COMPETITOR_CONFIG)
            .await?
            .unwrap_or_else(|| CompetitorConfig::empty(self.clock.now())))
    }

    /// Clean and merge `update` into the stored configuration. The result
    /// has no TTL.
    pub async fn update_config(&self, update: CompetitorConfigUpdate) -> Result<CompetitorConfig> {
        let update = clean_update(update)?;
        let merged = self.get_config().await?.merged(update, self.clock.now());
        self.kv
            .set_json(keys::COMPETITOR_CONFIG, &merged, None)
            .await?;
        tracing::info!(
            competitors = merged.competitors.len(),
            keywords = merged.keywords.len(),
            "updated competitor config"
        );
        Ok(merged)
    }

    pub async fn get_snapshot(&self) -> Result<Option<CompetitorSnapshot>> {
        Ok(self.kv.get_json(keys::COMPETITOR_DATA).await?)
    }

    pub async fn set_snapshot(&self, data: Value) -> Result<CompetitorSnapshot> {
        let snapshot = CompetitorSnapshot {
            data,
            timestamp: self.clock.now_millis(),
        };
        self.kv
            .set_json(keys::COMPETITOR_DATA, &snapshot, Some(self.data_ttl))
            .await?;
        Ok(snapshot)
    }
}

/// Bound list sizes and normalize entries, dropping ones that end up empty.
fn clean_update(update: CompetitorConfigUpdate) -> Result<CompetitorConfigUpdate> {
    if let Some(competitors) = &update.competitors
        && competitors.len() > MAX_COMPETITORS
    {
        return Err(KeeperError::InvalidRecord {
            reason: format!("maximum {MAX_COMPETITORS} competitors allowed"),
        });
    }
    if let Some(keywords) = &update.keywords
        && keywords.len() > MAX_KEYWORDS
    {
        return Err(KeeperError::InvalidRecord {
            reason: format!("maximum {MAX_KEYWORDS} keywords allowed"),
        });
    }

    let clean = |items: Vec<String>, f: fn(&str) -> String| -> Vec<String> {
        items
            .iter()
            .map(|s| f(s))
            .filter(|s| !s.is_empty())
            .collect()
    };
    Ok(CompetitorConfigUpdate {
        competitors: update.competitors.map(|c| clean(c, normalize_competitor)),
        keywords: update.keywords.map(|k| clean(k, |s| s.trim().to_lowercase())),
    })
}

/// `"https://www.Rival.com/"` → `"rival.com"`.
pub fn normalize_competitor(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let host = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.strip_suffix('/').unwrap_or(host).to_owned()
}
