//! Store key layout.
//!
//! Every key lightkeeper-core writes is built here, so the layout can be
//! read in one place.

/// The singleton latest-scan snapshot.
pub const REPORTS_LATEST: &str = "reports:latest";
/// Newest-first list of retained run timestamps.
pub const REPORTS_RUNS_LIST: &str = "reports:runs:list";
const REPORTS_RUN_PREFIX: &str = "reports:runs:";

/// Current AI analysis (`{data, timestamp}`).
pub const INSIGHTS_LATEST: &str = "ai-insights:latest";
/// Generation lock.
pub const INSIGHTS_GENERATING: &str = "ai-insights:generating";
/// Newest-first list of history entry timestamps.
pub const INSIGHTS_HISTORY_LIST: &str = "ai-insights:history:list";
const INSIGHTS_HISTORY_PREFIX: &str = "ai-insights:history:";

/// Persistent competitor configuration.
pub const COMPETITOR_CONFIG: &str = "competitor:config";
/// Last competitor analysis.
pub const COMPETITOR_DATA: &str = "competitor:data";
pub const COMPETITOR_KEYWORDS_PREFIX: &str = "competitor:keywords:";
pub const DOMAIN_PAGES_PREFIX: &str = "competitor:pages:";
pub const KEYWORD_IDEAS_PREFIX: &str = "competitor:ideas:";

/// Key of one stored run.
pub fn report_run(timestamp: &str) -> String {
    format!("{REPORTS_RUN_PREFIX}{timestamp}")
}

/// Key of one insight history entry.
pub fn insight_history(timestamp_millis: i64) -> String {
    format!("{INSIGHTS_HISTORY_PREFIX}{timestamp_millis}")
}
