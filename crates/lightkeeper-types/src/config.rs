//! Configuration schema.
//!
//! [`KeeperConfig`] is built once at startup (see
//! `lightkeeper_platform::config_loader`), validated with
//! [`KeeperConfig::validate`], and then handed to every component by
//! reference. Every field has a default, so an empty JSON object is a
//! valid (if unauthenticated) configuration. Fields accept both
//! `snake_case` and `camelCase` names.

use serde::{Deserialize, Serialize};

use crate::error::KeeperError;
use crate::secret::SecretString;

/// Allowed range for the report retention count.
pub const REPORTS_MAX_RUNS_RANGE: std::ops::RangeInclusive<usize> = 1..=365;

/// Allowed range for the insight history retention count.
pub const INSIGHT_HISTORY_MAX_RANGE: std::ops::RangeInclusive<usize> = 1..=100;

const MIB: usize = 1024 * 1024;
const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeeperConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Key-value backend selection.
    #[serde(default)]
    pub kv: KvConfig,

    /// Upload endpoint: credentials, size limits, rate limiting, replay window.
    #[serde(default)]
    pub upload: UploadConfig,

    /// How many report runs and insight history entries are kept.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// AI insight cache timing.
    #[serde(default)]
    pub insights: InsightConfig,

    /// TTLs of the third-party lookup caches.
    #[serde(default)]
    pub caches: CacheTtlConfig,

    /// Read-endpoint access control.
    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl KeeperConfig {
    /// Check cross-field constraints. Called once at startup; a failure
    /// aborts the process.
    pub fn validate(&self) -> Result<(), KeeperError> {
        let upload = &self.upload;
        if upload.hard_limit_bytes == 0 {
            return Err(KeeperError::config("upload.hard_limit_bytes must be positive"));
        }
        if upload.soft_limit_bytes > upload.hard_limit_bytes {
            return Err(KeeperError::config(
                "upload.soft_limit_bytes must not exceed upload.hard_limit_bytes",
            ));
        }
        if upload.rate_limit == 0 {
            return Err(KeeperError::config("upload.rate_limit must be at least 1"));
        }
        if upload.rate_window_secs == 0 {
            return Err(KeeperError::config("upload.rate_window_secs must be at least 1"));
        }
        if upload.timestamp_tolerance_secs <= 0 {
            return Err(KeeperError::config(
                "upload.timestamp_tolerance_secs must be positive",
            ));
        }
        // A signature stays acceptable from `ts - tolerance` to
        // `ts + tolerance`; the nonce must outlive that whole span.
        let span = 2 * upload.timestamp_tolerance_secs as u64;
        if upload.nonce_ttl_secs < span {
            return Err(KeeperError::config(format!(
                "upload.nonce_ttl_secs must be at least {span} (twice the timestamp tolerance)"
            )));
        }

        let retention = &self.retention;
        if !REPORTS_MAX_RUNS_RANGE.contains(&retention.reports_max_runs) {
            return Err(KeeperError::config(format!(
                "REPORTS_MAX_RUNS must be between {} and {}",
                REPORTS_MAX_RUNS_RANGE.start(),
                REPORTS_MAX_RUNS_RANGE.end()
            )));
        }
        if !INSIGHT_HISTORY_MAX_RANGE.contains(&retention.insight_history_max) {
            return Err(KeeperError::config(format!(
                "INSIGHT_HISTORY_MAX must be between {} and {}",
                INSIGHT_HISTORY_MAX_RANGE.start(),
                INSIGHT_HISTORY_MAX_RANGE.end()
            )));
        }

        if self.insights.generating_ttl_secs == 0 {
            return Err(KeeperError::config("insights.generating_ttl_secs must be positive"));
        }
        if self.kv.backend == KvBackend::Redis && self.kv.url.as_deref().unwrap_or("").is_empty() {
            return Err(KeeperError::config("kv.url is required for the redis backend"));
        }
        Ok(())
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allowed CORS origins. Empty means permissive.
    #[serde(default, alias = "corsOrigins")]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8787".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: Vec::new(),
        }
    }
}

// ── Key-value backend ────────────────────────────────────────────────────

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    /// In-process store. State is lost on restart.
    #[default]
    Memory,
    /// Redis (or any RESP-compatible server).
    Redis,
}

/// Key-value backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(default)]
    pub backend: KvBackend,

    /// Connection URL, e.g. `redis://127.0.0.1:6379`.
    #[serde(default)]
    pub url: Option<String>,
}

// ── Upload ───────────────────────────────────────────────────────────────

/// Upload endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// HMAC-SHA256 key for signed uploads. When set, bearer auth is disabled.
    #[serde(default, alias = "signingKey")]
    pub signing_key: SecretString,

    /// Legacy shared bearer secret.
    #[serde(default)]
    pub secret: SecretString,

    /// Bodies larger than this are rejected with 413.
    #[serde(default = "default_hard_limit", alias = "hardLimitBytes")]
    pub hard_limit_bytes: usize,

    /// Bodies larger than this are accepted but logged.
    #[serde(default = "default_soft_limit", alias = "softLimitBytes")]
    pub soft_limit_bytes: usize,

    /// Uploads allowed per caller per window.
    #[serde(default = "default_rate_limit", alias = "rateLimit")]
    pub rate_limit: u32,

    /// Rate-limit window length.
    #[serde(default = "default_rate_window", alias = "rateWindowSecs")]
    pub rate_window_secs: u64,

    /// Maximum clock skew accepted on `X-Timestamp`.
    #[serde(default = "default_tolerance", alias = "timestampToleranceSecs")]
    pub timestamp_tolerance_secs: i64,

    /// How long a used nonce is remembered.
    #[serde(default = "default_nonce_ttl", alias = "nonceTtlSecs")]
    pub nonce_ttl_secs: u64,
}

fn default_hard_limit() -> usize {
    4 * MIB
}
fn default_soft_limit() -> usize {
    MIB
}
fn default_rate_limit() -> u32 {
    10
}
fn default_rate_window() -> u64 {
    60
}
fn default_tolerance() -> i64 {
    300
}
fn default_nonce_ttl() -> u64 {
    600
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            signing_key: SecretString::default(),
            secret: SecretString::default(),
            hard_limit_bytes: default_hard_limit(),
            soft_limit_bytes: default_soft_limit(),
            rate_limit: default_rate_limit(),
            rate_window_secs: default_rate_window(),
            timestamp_tolerance_secs: default_tolerance(),
            nonce_ttl_secs: default_nonce_ttl(),
        }
    }
}

// ── Retention ────────────────────────────────────────────────────────────

/// Retention of indexed history.
///
/// Counts bound what listing returns; TTLs are a backstop that expires
/// records even if index maintenance stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_reports_max_runs", alias = "reportsMaxRuns")]
    pub reports_max_runs: usize,

    #[serde(default = "default_reports_ttl", alias = "reportsTtlSecs")]
    pub reports_ttl_secs: u64,

    #[serde(default = "default_history_max", alias = "insightHistoryMax")]
    pub insight_history_max: usize,

    #[serde(default = "default_history_ttl", alias = "insightHistoryTtlSecs")]
    pub insight_history_ttl_secs: u64,
}

fn default_reports_max_runs() -> usize {
    30
}
fn default_reports_ttl() -> u64 {
    60 * DAY
}
fn default_history_max() -> usize {
    10
}
fn default_history_ttl() -> u64 {
    30 * DAY
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            reports_max_runs: default_reports_max_runs(),
            reports_ttl_secs: default_reports_ttl(),
            insight_history_max: default_history_max(),
            insight_history_ttl_secs: default_history_ttl(),
        }
    }
}

// ── Insights ─────────────────────────────────────────────────────────────

/// AI insight cache timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Lifetime of the cached analysis.
    #[serde(default = "default_insight_ttl", alias = "ttlSecs")]
    pub ttl_secs: u64,

    /// Age after which the cached analysis is reported stale.
    #[serde(default = "default_stale_threshold", alias = "staleThresholdSecs")]
    pub stale_threshold_secs: u64,

    /// Lifetime of the generation lock.
    #[serde(default = "default_generating_ttl", alias = "generatingTtlSecs")]
    pub generating_ttl_secs: u64,
}

fn default_insight_ttl() -> u64 {
    4 * HOUR
}
fn default_stale_threshold() -> u64 {
    2 * HOUR
}
fn default_generating_ttl() -> u64 {
    300
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_insight_ttl(),
            stale_threshold_secs: default_stale_threshold(),
            generating_ttl_secs: default_generating_ttl(),
        }
    }
}

// ── Lookup caches ────────────────────────────────────────────────────────

/// TTLs of the third-party lookup caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    #[serde(default = "default_hour", alias = "competitorKeywordsSecs")]
    pub competitor_keywords_secs: u64,

    #[serde(default = "default_four_hours", alias = "domainPagesSecs")]
    pub domain_pages_secs: u64,

    #[serde(default = "default_hour", alias = "keywordIdeasSecs")]
    pub keyword_ideas_secs: u64,

    #[serde(default = "default_four_hours", alias = "competitorDataSecs")]
    pub competitor_data_secs: u64,
}

fn default_hour() -> u64 {
    HOUR
}
fn default_four_hours() -> u64 {
    4 * HOUR
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            competitor_keywords_secs: default_hour(),
            domain_pages_secs: default_four_hours(),
            keyword_ideas_secs: default_hour(),
            competitor_data_secs: default_four_hours(),
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// Read-endpoint access control.
///
/// Sign-in happens in an OAuth proxy in front of lightkeeper; the proxy
/// forwards the authenticated email in [`identity_header`](Self::identity_header).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_identity_header", alias = "identityHeader")]
    pub identity_header: String,

    /// If set, only emails in this domain may read.
    #[serde(default, alias = "allowedEmailDomain")]
    pub allowed_email_domain: Option<String>,
}

fn default_identity_header() -> String {
    "x-forwarded-email".into()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            identity_header: default_identity_header(),
            allowed_email_domain: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_yields_defaults() {
        let config: KeeperConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8787");
        assert_eq!(config.upload.hard_limit_bytes, 4 * 1024 * 1024);
        assert_eq!(config.upload.soft_limit_bytes, 1024 * 1024);
        assert_eq!(config.upload.rate_limit, 10);
        assert_eq!(config.upload.timestamp_tolerance_secs, 300);
        assert_eq!(config.retention.reports_max_runs, 30);
        assert_eq!(config.retention.insight_history_max, 10);
        assert_eq!(config.insights.stale_threshold_secs, 7200);
        assert_eq!(config.insights.generating_ttl_secs, 300);
        assert_eq!(config.kv.backend, KvBackend::Memory);
        assert!(!config.upload.signing_key.is_configured());
        config.validate().unwrap();
    }

    #[test]
    fn camel_case_aliases() {
        let config: KeeperConfig = serde_json::from_value(json!({
            "upload": { "signingKey": "k", "rateLimit": 3 },
            "retention": { "reportsMaxRuns": 5 },
            "viewer": { "allowedEmailDomain": "example.com" }
        }))
        .unwrap();
        assert_eq!(config.upload.signing_key.expose(), "k");
        assert_eq!(config.upload.rate_limit, 3);
        assert_eq!(config.retention.reports_max_runs, 5);
        assert_eq!(config.viewer.allowed_email_domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn rejects_out_of_range_retention() {
        let mut config = KeeperConfig::default();
        config.retention.reports_max_runs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REPORTS_MAX_RUNS must be between"));

        config.retention.reports_max_runs = 366;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_short_nonce_ttl() {
        let mut config = KeeperConfig::default();
        config.upload.nonce_ttl_secs = 300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nonce_ttl_secs"));
    }

    #[test]
    fn rejects_soft_limit_above_hard_limit() {
        let mut config = KeeperConfig::default();
        config.upload.soft_limit_bytes = config.upload.hard_limit_bytes + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn redis_backend_requires_url() {
        let mut config = KeeperConfig::default();
        config.kv.backend = KvBackend::Redis;
        assert!(config.validate().is_err());
        config.kv.url = Some("redis://127.0.0.1:6379".into());
        config.validate().unwrap();
    }
}
