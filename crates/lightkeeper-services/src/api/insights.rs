//! AI insight endpoints.
//!
//! Reads never block on generation. A refresh takes the generation lock,
//! spawns the generator and answers `202` straight away; the task stores
//! the result (which releases the lock) or releases the lock on failure.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use lightkeeper_core::InsightCache;
use lightkeeper_types::insight::{CacheStatus, InsightHistoryEntry};
use serde::Serialize;
use serde_json::{Value, json};

use super::{ApiState, InsightGenerator, Viewer};
use crate::error::{ApiError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse {
    pub cache_status: CacheStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    pub is_generating: bool,
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub async fn get_insights(State(state): State<ApiState>, _viewer: Viewer) -> Result<Json<InsightResponse>> {
    let snapshot = state.insights.get().await?;
    let cache_status = CacheStatus::of(snapshot.as_ref());

    let response = match snapshot {
        Some(s) => InsightResponse {
            cache_status,
            cached_at: s.cached_at(),
            is_generating: s.is_generating,
            message: (cache_status == CacheStatus::Stale)
                .then_some("Data is stale. Refresh to get updated insights."),
            data: Some(s.data),
        },
        None => InsightResponse {
            cache_status,
            cached_at: None,
            is_generating: state.insights.is_generating().await?,
            data: None,
            message: Some("No AI insights available. Refresh to generate."),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: &'static str,
    pub count: usize,
    pub data: Vec<InsightHistoryEntry>,
}

pub async fn get_history(State(state): State<ApiState>, _viewer: Viewer) -> Result<Json<HistoryResponse>> {
    let data = state.insights.history().await?;
    Ok(Json(HistoryResponse {
        status: "success",
        count: data.len(),
        data,
    }))
}

/// Start a background regeneration unless one is already running.
pub async fn refresh(State(state): State<ApiState>, viewer: Viewer) -> Result<(StatusCode, Json<Value>)> {
    let generator = state.generator.clone().ok_or(ApiError::GeneratorUnavailable)?;

    if !state.insights.try_begin_generation().await? {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "status": "already_generating",
                "message": "Insights are already being generated. Check back shortly.",
            })),
        ));
    }

    tracing::info!(viewer = %viewer.email, "insight refresh started");
    tokio::spawn(run_generation(state.insights.clone(), generator));

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "started" }))))
}

async fn run_generation(cache: Arc<InsightCache>, generator: Arc<dyn InsightGenerator>) {
    match generator.generate().await {
        Ok(data) => {
            if let Err(e) = cache.set(data).await {
                tracing::error!(error = %e, "failed to store generated insight");
                release(&cache).await;
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "insight generation failed");
            release(&cache).await;
        }
    }
}

async fn release(cache: &InsightCache) {
    if let Err(e) = cache.set_generating(false).await {
        tracing::warn!(error = %e, "failed to release generation lock; it will expire");
    }
}
