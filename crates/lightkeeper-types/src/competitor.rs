//! Competitor tracking records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which competitors and keywords the dashboard tracks. Persisted without a
/// TTL; edited from the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorConfig {
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl CompetitorConfig {
    /// An empty configuration stamped with `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            competitors: Vec::new(),
            keywords: Vec::new(),
            last_updated: now,
        }
    }

    /// Apply a partial update. Fields absent from `update` keep their
    /// current values.
    pub fn merged(self, update: CompetitorConfigUpdate, now: DateTime<Utc>) -> Self {
        Self {
            competitors: update.competitors.unwrap_or(self.competitors),
            keywords: update.keywords.unwrap_or(self.keywords),
            last_updated: now,
        }
    }
}

/// Partial update of a [`CompetitorConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitorConfigUpdate {
    #[serde(default)]
    pub competitors: Option<Vec<String>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

/// Last competitor analysis, cached with a TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSnapshot {
    /// Opaque analysis payload.
    pub data: Value,
    /// Epoch milliseconds.
    pub timestamp: i64,
}
