//! Lighthouse scan records.
//!
//! A scan produces a [`LatestReport`] (the singleton snapshot shown on the
//! dashboard) and optionally a [`ReportRun`] kept in the bounded run
//! history. Runs are identified by a fixed-width `YYYYMMDD-HHMMSS`
//! timestamp, so lexicographic order equals chronological order.
//!
//! Uploads arrive as an [`UploadPayload`]; its `latest` and `run` parts are
//! lenient about server-filled fields (`updatedAt`, `date`) and are turned
//! into stored records with [`LatestUpload::into_report`] and
//! [`RunUpload::into_run`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KeeperError;

/// `chrono` format string of a run timestamp.
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Length of a well-formed run timestamp.
const RUN_TIMESTAMP_LEN: usize = 15;

/// Scan device profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Desktop,
}

/// The four Lighthouse category scores, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LighthouseScore {
    pub performance: u32,
    pub accessibility: u32,
    #[serde(rename = "best-practices", alias = "bestPractices")]
    pub best_practices: u32,
    pub seo: u32,
}

/// Scores per device profile. Either side may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<LighthouseScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<LighthouseScore>,
}

impl DeviceScores {
    /// Scores for one device, if that device was scanned.
    pub fn get(&self, device: Device) -> Option<&LighthouseScore> {
        match device {
            Device::Mobile => self.mobile.as_ref(),
            Device::Desktop => self.desktop.as_ref(),
        }
    }

    /// `true` when neither device has scores.
    pub fn is_empty(&self) -> bool {
        self.mobile.is_none() && self.desktop.is_none()
    }
}

/// One report inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub timestamp: String,
    pub url: String,
    #[serde(default)]
    pub scores: DeviceScores,
}

/// Scores for a single page of the scanned site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScore {
    pub path: String,
    pub url: String,
    #[serde(default)]
    pub scores: DeviceScores,
}

/// A historical scan run. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRun {
    /// Run identifier in `YYYYMMDD-HHMMSS` form.
    pub timestamp: String,
    /// When the run was produced.
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub reports: Vec<ReportData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_scores: Option<Vec<PageScore>>,
}

impl ReportRun {
    /// The run time encoded in [`timestamp`](Self::timestamp), if well formed.
    pub fn run_time(&self) -> Option<NaiveDateTime> {
        parse_run_timestamp(&self.timestamp)
    }
}

/// The singleton "latest scan" snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestReport {
    pub timestamp: String,
    #[serde(default)]
    pub scores: DeviceScores,
    #[serde(default)]
    pub page_scores: Vec<PageScore>,
    pub updated_at: DateTime<Utc>,
}

/// Body of an upload request.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadPayload {
    #[serde(default)]
    pub latest: Option<LatestUpload>,
    #[serde(default)]
    pub run: Option<RunUpload>,
}

/// The `latest` part of an upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestUpload {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub scores: DeviceScores,
    #[serde(default)]
    pub page_scores: Vec<PageScore>,
}

impl LatestUpload {
    /// Stamp the snapshot with the server time. A missing scan timestamp
    /// falls back to `now` in RFC 3339 form.
    pub fn into_report(self, now: DateTime<Utc>) -> LatestReport {
        LatestReport {
            timestamp: self
                .timestamp
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| now.to_rfc3339()),
            scores: self.scores,
            page_scores: self.page_scores,
            updated_at: now,
        }
    }
}

/// The optional `run` part of an upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunUpload {
    pub timestamp: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reports: Vec<ReportData>,
    #[serde(default)]
    pub page_scores: Option<Vec<PageScore>>,
}

impl RunUpload {
    /// Validate the run timestamp and build the stored record.
    ///
    /// The timestamp doubles as a storage key and a sort key, so anything
    /// other than a well-formed `YYYYMMDD-HHMMSS` value is rejected.
    pub fn into_run(self, now: DateTime<Utc>) -> Result<ReportRun, KeeperError> {
        if parse_run_timestamp(&self.timestamp).is_none() {
            return Err(KeeperError::InvalidRecord {
                reason: format!(
                    "run timestamp must match YYYYMMDD-HHMMSS, got {:?}",
                    self.timestamp
                ),
            });
        }
        Ok(ReportRun {
            timestamp: self.timestamp,
            date: self.date.unwrap_or(now),
            reports: self.reports,
            page_scores: self.page_scores,
        })
    }
}

/// Parse a `YYYYMMDD-HHMMSS` run timestamp.
///
/// Only the exact fixed-width form is accepted; `chrono` alone would allow
/// unpadded fields, which would break lexicographic ordering.
pub fn parse_run_timestamp(ts: &str) -> Option<NaiveDateTime> {
    if ts.len() != RUN_TIMESTAMP_LEN || !ts.is_ascii() {
        return None;
    }
    NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).ok()
}
