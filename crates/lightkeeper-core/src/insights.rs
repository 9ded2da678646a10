//! AI insight cache.
//!
//! One current analysis (`ai-insights:latest`) with a TTL, a generation lock
//! (`ai-insights:generating`) with its own short TTL, and a bounded rolling
//! history of past analyses.
//!
//! The lock is advisory. It is held while the key exists; releasing it
//! deletes the key, so [`InsightCache::try_begin_generation`] can take it
//! with one set-if-absent. A crashed generator loses the lock when the TTL
//! runs out.

use std::sync::Arc;
use std::time::Duration;

use lightkeeper_platform::{Clock, KvStore, KvWrite};
use lightkeeper_types::Result;
use lightkeeper_types::config::{InsightConfig, RetentionConfig};
use lightkeeper_types::insight::{CachedInsight, InsightHistoryEntry, InsightSnapshot};
use serde_json::Value;

use crate::index::IndexUpdate;
use crate::keys;

const GENERATING_MARKER: &str = "true";

pub struct InsightCache {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    stale_threshold: Duration,
    generating_ttl: Duration,
    history_max: usize,
    history_ttl: Duration,
}

impl InsightCache {
    pub fn new(
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        insights: &InsightConfig,
        retention: &RetentionConfig,
    ) -> Self {
        Self {
            kv,
            clock,
            ttl: Duration::from_secs(insights.ttl_secs),
            stale_threshold: Duration::from_secs(insights.stale_threshold_secs),
            generating_ttl: Duration::from_secs(insights.generating_ttl_secs),
            history_max: retention.insight_history_max,
            history_ttl: Duration::from_secs(retention.insight_history_ttl_secs),
        }
    }

    /// Current analysis with derived flags, or `None` when nothing is cached.
    ///
    /// `is_stale` is true once the record is strictly older than the stale
    /// threshold.
    pub async fn get(&self) -> Result<Option<InsightSnapshot>> {
        let Some(cached) = self
            .kv
            .get_json::<CachedInsight>(keys::INSIGHTS_LATEST)
            .await?
        else {
            return Ok(None);
        };
        let is_generating = self.is_generating().await?;

        let age_ms = self.clock.now_millis().saturating_sub(cached.timestamp);
        let threshold_ms = i64::try_from(self.stale_threshold.as_millis()).unwrap_or(i64::MAX);

        Ok(Some(InsightSnapshot {
            data: cached.data,
            timestamp: cached.timestamp,
            is_stale: age_ms > threshold_ms,
            is_generating,
        }))
    }

    /// Store a new analysis.
    ///
    /// In one batch: the current record, release of the generation lock,
    /// a history entry, deletion of evicted history entries, and the new
    /// history index.
    pub async fn set(&self, data: Value) -> Result<CachedInsight> {
        let now = self.clock.now();
        let timestamp = now.timestamp_millis();
        let record = CachedInsight {
            data: data.clone(),
            timestamp,
        };
        let entry = InsightHistoryEntry {
            data,
            timestamp,
            date: now,
        };

        let current = self.history_timestamps().await?;
        let update = IndexUpdate::compute(current, timestamp, self.history_max);

        let mut batch = vec![
            KvWrite::set_json(keys::INSIGHTS_LATEST, &record, Some(self.ttl))?,
            KvWrite::delete(keys::INSIGHTS_GENERATING),
            KvWrite::set_json(
                keys::insight_history(timestamp),
                &entry,
                Some(self.history_ttl),
            )?,
        ];
        batch.extend(
            update
                .evicted
                .iter()
                .map(|ts| KvWrite::delete(keys::insight_history(*ts))),
        );
        batch.push(KvWrite::set_json(
            keys::INSIGHTS_HISTORY_LIST,
            &update.kept,
            Some(self.history_ttl),
        )?);
        self.kv.apply_batch(batch).await?;

        tracing::info!(timestamp, history = update.kept.len(), "stored AI insight");
        Ok(record)
    }

    /// Take or release the generation lock unconditionally.
    pub async fn set_generating(&self, generating: bool) -> Result<()> {
        if generating {
            self.kv
                .set(
                    keys::INSIGHTS_GENERATING,
                    GENERATING_MARKER.to_owned(),
                    Some(self.generating_ttl),
                )
                .await?;
        } else {
            self.kv.del(keys::INSIGHTS_GENERATING).await?;
        }
        Ok(())
    }

    /// Take the generation lock if nobody holds it. Returns `false` when a
    /// generation is already running.
    pub async fn try_begin_generation(&self) -> Result<bool> {
        let taken = self
            .kv
            .set_nx(
                keys::INSIGHTS_GENERATING,
                GENERATING_MARKER.to_owned(),
                self.generating_ttl,
            )
            .await?;
        if !taken {
            tracing::debug!("insight generation already in progress");
        }
        Ok(taken)
    }

    pub async fn is_generating(&self) -> Result<bool> {
        Ok(self.kv.get(keys::INSIGHTS_GENERATING).await?.is_some())
    }

    /// Past analyses, newest first. Entries missing from the store are
    /// skipped.
    pub async fn history(&self) -> Result<Vec<InsightHistoryEntry>> {
        let timestamps = self.history_timestamps().await?;
        let mut entries = Vec::with_capacity(timestamps.len());
        for ts in timestamps {
            if let Some(entry) = self
                .kv
                .get_json::<InsightHistoryEntry>(&keys::insight_history(ts))
                .await?
            {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn history_timestamps(&self) -> Result<Vec<i64>> {
        Ok(self
            .kv
            .get_json::<Vec<i64>>(keys::INSIGHTS_HISTORY_LIST)
            .await?
            .unwrap_or_default())
    }
}
