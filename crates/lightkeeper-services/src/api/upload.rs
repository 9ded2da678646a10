//! `POST /api/reports/upload`.
//!
//! Checks run cheapest first: rate limit, declared size, actual size,
//! authentication, JSON decode, content screening, then the typed decode
//! and the writes. Every response after the rate-limit check carries the
//! `X-RateLimit-*` headers.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use lightkeeper_security::identity::client_identity;
use lightkeeper_security::{AuthMethod, RateLimitResult};
use lightkeeper_types::report::UploadPayload;
use serde::Serialize;
use serde_json::Value;

use super::ApiState;
use crate::error::{ApiError, Result};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    pub stored: StoredParts,
    pub auth_method: AuthMethod,
}

#[derive(Debug, Serialize)]
pub struct StoredParts {
    pub latest: bool,
    pub run: bool,
}

pub async fn upload_reports(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let upload = &state.config.upload;
    let identity = client_identity(&headers);
    let limit = state
        .rate_limiter
        .check(&identity, upload.rate_limit, upload.rate_window_secs)
        .await;

    let mut response = if limit.allowed {
        match handle_upload(&state, &headers, body).await {
            Ok(ok) => Json(ok).into_response(),
            Err(e) => e.into_response(),
        }
    } else {
        tracing::warn!(identity = %identity, "upload rate limit exceeded");
        ApiError::RateLimited {
            retry_after_secs: limit.retry_after_secs(state.clock.now()),
        }
        .into_response()
    };
    insert_rate_limit_headers(response.headers_mut(), &limit);
    response
}

async fn handle_upload(state: &ApiState, headers: &HeaderMap, body: Body) -> Result<UploadResponse> {
    let upload = &state.config.upload;

    if let Some(declared) = declared_length(headers)
        && declared > upload.hard_limit_bytes
    {
        return Err(ApiError::PayloadTooLarge {
            limit: upload.hard_limit_bytes,
            size: Some(declared),
        });
    }

    let raw = read_body(body, upload.hard_limit_bytes).await?;
    if raw.len() > upload.soft_limit_bytes {
        tracing::warn!(
            size = raw.len(),
            soft_limit = upload.soft_limit_bytes,
            "large upload payload accepted"
        );
    }

    let method = state.authenticator.authenticate(headers, &raw).await.map_err(|e| {
        tracing::warn!(reason = e.code(), "upload authentication failed");
        ApiError::Authentication(e)
    })?;

    let document: Value = serde_json::from_slice(&raw).map_err(|_| ApiError::InvalidJson)?;
    if let Some(found) = state.sanitizer.scan(&document) {
        return Err(ApiError::ForbiddenContent(found));
    }
    if document.get("latest").is_none_or(Value::is_null) {
        return Err(ApiError::MissingLatest);
    }

    let payload: UploadPayload = serde_json::from_value(document)
        .map_err(|e| ApiError::InvalidPayload(format!("invalid upload payload: {e}")))?;
    let now = state.clock.now();
    let latest = payload
        .latest
        .ok_or(ApiError::MissingLatest)?
        .into_report(now);
    let run = payload.run.map(|r| r.into_run(now)).transpose()?;

    state.reports.store_latest(&latest).await?;
    if let Some(run) = &run {
        state.reports.store_run(run).await?;
    }

    tracing::info!(
        method = method.as_str(),
        size = raw.len(),
        run = run.as_ref().map(|r| r.timestamp.as_str()),
        "upload stored"
    );
    Ok(UploadResponse {
        success: true,
        message: "Reports stored successfully",
        stored: StoredParts {
            latest: true,
            run: run.is_some(),
        },
        auth_method: method,
    })
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Collect the body, stopping as soon as it exceeds `limit`.
async fn read_body(body: Body, limit: usize) -> Result<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge { limit, size: None })
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read upload body");
            Err(ApiError::InvalidPayload("failed to read request body".into()))
        }
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, limit: &RateLimitResult) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(limit.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(limit.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(limit.reset_at.timestamp()));
}
