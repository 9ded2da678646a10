//! Report persistence.
//!
//! [`ReportStore`] keeps the singleton latest snapshot and a bounded,
//! newest-first history of scan runs. Each run is stored under its own key
//! with a TTL; the runs index lists the retained timestamps.
//!
//! Writing a run is two store calls: the run record, then one atomic batch
//! that writes the new index and deletes every evicted run. If two uploads
//! race, one index update can be lost; the losing run is then an orphan
//! that nothing lists and that expires by TTL. Readers skip index entries
//! whose record is missing.

use std::sync::Arc;
use std::time::Duration;

use lightkeeper_platform::{KvStore, KvWrite};
use lightkeeper_types::config::RetentionConfig;
use lightkeeper_types::report::{LatestReport, PageScore, ReportRun, parse_run_timestamp};
use lightkeeper_types::{KeeperError, Result};

use crate::index::IndexUpdate;
use crate::keys;

pub struct ReportStore {
    kv: Arc<dyn KvStore>,
    max_runs: usize,
    run_ttl: Duration,
}

impl ReportStore {
    pub fn new(kv: Arc<dyn KvStore>, max_runs: usize, run_ttl: Duration) -> Self {
        Self {
            kv,
            max_runs,
            run_ttl,
        }
    }

    pub fn from_config(retention: &RetentionConfig, kv: Arc<dyn KvStore>) -> Self {
        Self::new(
            kv,
            retention.reports_max_runs,
            Duration::from_secs(retention.reports_ttl_secs),
        )
    }

    // ── latest ─────────────────────────────────────────────────────────

    /// Overwrite the latest snapshot. It has no TTL.
    pub async fn store_latest(&self, report: &LatestReport) -> Result<()> {
        self.kv.set_json(keys::REPORTS_LATEST, report, None).await?;
        tracing::info!(timestamp = %report.timestamp, "stored latest report");
        Ok(())
    }

    pub async fn get_latest(&self) -> Result<Option<LatestReport>> {
        Ok(self.kv.get_json(keys::REPORTS_LATEST).await?)
    }

    /// Page scores of the latest snapshot, homepage first, then by path.
    pub async fn latest_page_scores(&self) -> Result<Vec<PageScore>> {
        let mut pages = self
            .get_latest()
            .await?
            .map(|latest| latest.page_scores)
            .unwrap_or_default();
        sort_pages(&mut pages);
        Ok(pages)
    }

    /// Scores for one page of the latest snapshot.
    pub async fn page_scores(&self, path: &str) -> Result<Option<PageScore>> {
        Ok(self
            .latest_page_scores()
            .await?
            .into_iter()
            .find(|p| p.path == path))
    }

    // ── runs ───────────────────────────────────────────────────────────

    /// Persist a run and add it to the index, evicting the oldest runs
    /// beyond capacity.
    pub async fn store_run(&self, run: &ReportRun) -> Result<()> {
        if parse_run_timestamp(&run.timestamp).is_none() {
            return Err(KeeperError::InvalidRecord {
                reason: format!("run timestamp must match YYYYMMDD-HHMMSS, got {:?}", run.timestamp),
            });
        }

        self.kv
            .set_json(&keys::report_run(&run.timestamp), run, Some(self.run_ttl))
            .await?;

        let current = self.run_timestamps().await?;
        let update = IndexUpdate::compute(current, run.timestamp.clone(), self.max_runs);

        let mut batch = Vec::with_capacity(update.evicted.len() + 1);
        for ts in &update.evicted {
            batch.push(KvWrite::delete(keys::report_run(ts)));
        }
        batch.push(KvWrite::set_json(
            keys::REPORTS_RUNS_LIST,
            &update.kept,
            Some(self.run_ttl),
        )?);
        self.kv.apply_batch(batch).await?;

        if !update.evicted.is_empty() {
            tracing::debug!(evicted = ?update.evicted, "evicted report runs");
        }
        tracing::info!(timestamp = %run.timestamp, retained = update.kept.len(), "stored report run");
        Ok(())
    }

    /// Retained run timestamps, newest first.
    pub async fn run_timestamps(&self) -> Result<Vec<String>> {
        Ok(self
            .kv
            .get_json::<Vec<String>>(keys::REPORTS_RUNS_LIST)
            .await?
            .unwrap_or_default())
    }

    pub async fn get_run(&self, timestamp: &str) -> Result<Option<ReportRun>> {
        Ok(self.kv.get_json(&keys::report_run(timestamp)).await?)
    }

    /// Every indexed run, in index order. Index entries without a record
    /// are skipped.
    pub async fn get_all_runs(&self) -> Result<Vec<ReportRun>> {
        let timestamps = self.run_timestamps().await?;
        let mut runs = Vec::with_capacity(timestamps.len());
        for ts in &timestamps {
            match self.get_run(ts).await? {
                Some(run) => runs.push(run),
                None => tracing::debug!(timestamp = %ts, "indexed run missing, skipping"),
            }
        }
        Ok(runs)
    }
}

/// Homepage first, then ascending by path.
pub fn sort_pages(pages: &mut [PageScore]) {
    pages.sort_by(|a, b| match (a.path == "/", b.path == "/") {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.path.cmp(&b.path),
    });
}
