//! Competitor tracking endpoints.

use axum::Json;
use axum::extract::State;
use lightkeeper_types::competitor::{CompetitorConfig, CompetitorConfigUpdate};
use serde_json::{Value, json};

use super::{ApiState, Viewer};
use crate::error::Result;

pub async fn get_config(State(state): State<ApiState>, _viewer: Viewer) -> Result<Json<CompetitorConfig>> {
    Ok(Json(state.competitors.get_config().await?))
}

pub async fn update_config(
    State(state): State<ApiState>,
    viewer: Viewer,
    Json(update): Json<CompetitorConfigUpdate>,
) -> Result<Json<Value>> {
    let config = state.competitors.update_config(update).await?;
    tracing::debug!(viewer = %viewer.email, "competitor config changed");
    Ok(Json(json!({ "success": true, "config": config })))
}

/// Last competitor analysis, if still cached.
pub async fn get_snapshot(State(state): State<ApiState>, _viewer: Viewer) -> Result<Json<Value>> {
    let body = match state.competitors.get_snapshot().await? {
        Some(snapshot) => json!({
            "cacheStatus": "fresh",
            "cachedAt": chrono::DateTime::from_timestamp_millis(snapshot.timestamp),
            "data": snapshot.data,
        }),
        None => json!({ "cacheStatus": "empty", "data": null }),
    };
    Ok(Json(body))
}
