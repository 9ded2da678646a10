//! Route table and health check.

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::ApiState;

/// Build all API routes.
pub fn api_routes() -> Router<ApiState> {
    Router::new()
        // Upload enforces its own size limits.
        .route(
            "/reports/upload",
            post(super::upload::upload_reports).layer(DefaultBodyLimit::disable()),
        )
        // Dashboard reads
        .route("/reports", get(super::reports::get_reports))
        .route("/reports/pages", get(super::reports::get_pages))
        .route("/ai-insights", get(super::insights::get_insights))
        .route("/ai-insights/history", get(super::insights::get_history))
        .route("/ai-insights/refresh", post(super::insights::refresh))
        .route("/competitors", get(super::competitors::get_snapshot))
        .route(
            "/competitors/config",
            get(super::competitors::get_config).post(super::competitors::update_config),
        )
        .route("/health", get(health_check))
}

/// Version and key-value store reachability.
async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.kv.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "kv": "ok",
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "kv": "unavailable",
                })),
            )
        }
    }
}
