//! Cached AI analyses.
//!
//! The analysis payload is opaque JSON; lightkeeper only tracks when it was
//! produced. Staleness is never stored: [`InsightSnapshot::is_stale`] is
//! computed from the record age each time the cache is read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The stored "current analysis" record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedInsight {
    /// Opaque analysis payload.
    pub data: Value,
    /// When the analysis was stored, in epoch milliseconds.
    pub timestamp: i64,
}

/// What a cache read returns: the record plus derived flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSnapshot {
    pub data: Value,
    pub timestamp: i64,
    pub is_stale: bool,
    pub is_generating: bool,
}

impl InsightSnapshot {
    /// [`timestamp`](Self::timestamp) as an instant.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// One past analysis in the rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightHistoryEntry {
    pub data: Value,
    pub timestamp: i64,
    pub date: DateTime<Utc>,
}

/// Freshness of the insight cache as reported to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Stale,
    Empty,
}

impl CacheStatus {
    /// Classify an optional snapshot.
    pub fn of(snapshot: Option<&InsightSnapshot>) -> Self {
        match snapshot {
            None => Self::Empty,
            Some(s) if s.is_stale => Self::Stale,
            Some(_) => Self::Fresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(is_stale: bool) -> InsightSnapshot {
        InsightSnapshot {
            data: json!({ "summary": "ok" }),
            timestamp: 1_705_320_000_000,
            is_stale,
            is_generating: false,
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(CacheStatus::of(None), CacheStatus::Empty);
        assert_eq!(CacheStatus::of(Some(&snapshot(false))), CacheStatus::Fresh);
        assert_eq!(CacheStatus::of(Some(&snapshot(true))), CacheStatus::Stale);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let out = serde_json::to_value(snapshot(true)).unwrap();
        assert_eq!(out["isStale"], true);
        assert_eq!(out["isGenerating"], false);
    }

    #[test]
    fn cached_at_from_millis() {
        let at = snapshot(false).cached_at().unwrap();
        assert_eq!(at.timestamp_millis(), 1_705_320_000_000);
    }
}
