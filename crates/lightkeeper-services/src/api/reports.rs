//! Dashboard report reads.

use axum::Json;
use axum::extract::{Query, State};
use lightkeeper_core::trends::{TrendPoint, average_scores, chronological, trend_data};
use lightkeeper_types::report::{Device, LatestReport, LighthouseScore, ReportRun};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiState, Viewer};
use crate::error::{ApiError, Result};

/// Runs and chart points returned by `GET /api/reports`.
pub const RECENT_RUNS: usize = 14;

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    /// `None` until a scan with device scores has been uploaded.
    pub latest: Option<LatestReport>,
    pub runs: Vec<ReportRun>,
    pub averages: LighthouseScore,
    pub trends: Trends,
}

#[derive(Debug, Serialize)]
pub struct Trends {
    pub mobile: Vec<TrendPoint>,
    pub desktop: Vec<TrendPoint>,
}

pub async fn get_reports(State(state): State<ApiState>, _viewer: Viewer) -> Result<Json<ReportsResponse>> {
    let latest = state
        .reports
        .get_latest()
        .await?
        .filter(|l| !l.scores.is_empty());
    let mut runs = chronological(state.reports.get_all_runs().await?);
    runs.truncate(RECENT_RUNS);

    let trends = Trends {
        mobile: trend_data(&runs, Device::Mobile, RECENT_RUNS),
        desktop: trend_data(&runs, Device::Desktop, RECENT_RUNS),
    };
    Ok(Json(ReportsResponse {
        latest,
        averages: average_scores(&runs),
        runs,
        trends,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    pub path: Option<String>,
}

/// All page scores of the latest scan, or one page with `?path=`.
pub async fn get_pages(
    State(state): State<ApiState>,
    _viewer: Viewer,
    Query(query): Query<PagesQuery>,
) -> Result<Json<Value>> {
    if let Some(path) = query.path.filter(|p| !p.is_empty()) {
        let page = state
            .reports
            .page_scores(&path)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Page not found: {path}")))?;
        return Ok(Json(json!({ "page": page })));
    }

    let pages = state.reports.latest_page_scores().await?;
    Ok(Json(json!({ "count": pages.len(), "pages": pages })))
}
