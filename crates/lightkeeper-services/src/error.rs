//! API error types.
//!
//! Every rejection carries a machine-readable `reason`. Storage failures
//! are logged in full here and reach the client only as a generic message.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lightkeeper_security::{AuthError, ForbiddenContent};
use lightkeeper_types::KeeperError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// No authenticated viewer on a dashboard read.
    #[error("Unauthorized")]
    Unauthorized,

    /// Upload authentication failed.
    #[error("Unauthorized: {0}")]
    Authentication(#[from] AuthError),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Payload too large")]
    PayloadTooLarge { limit: usize, size: Option<usize> },

    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("Payload contains forbidden content")]
    ForbiddenContent(ForbiddenContent),

    #[error("Missing required field: latest")]
    MissingLatest,

    /// Well-formed JSON that does not describe a valid record.
    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    NotFound(String),

    #[error("AI insight generation is not configured")]
    GeneratorUnavailable,

    #[error("internal error")]
    Internal(#[from] KeeperError),
}

/// Convenience alias for handler results.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidJson
            | Self::ForbiddenContent(_)
            | Self::MissingLatest
            | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::GeneratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(KeeperError::InvalidRecord { .. }) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Authentication(e) => e.code(),
            Self::RateLimited { .. } => "rate_limited",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::InvalidJson => "invalid_json",
            Self::ForbiddenContent(_) => "forbidden_content",
            Self::MissingLatest => "missing_latest",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::NotFound(_) => "not_found",
            Self::GeneratorUnavailable => "generator_unavailable",
            Self::Internal(KeeperError::InvalidRecord { .. }) => "invalid_payload",
            Self::Internal(_) => "internal_error",
        }
    }
}

fn megabytes(bytes: usize) -> String {
    format!("{:.2}MB", bytes as f64 / (1024.0 * 1024.0))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = self.reason();

        let body = match &self {
            Self::RateLimited { retry_after_secs } => json!({
                "error": self.to_string(),
                "reason": reason,
                "retryAfter": retry_after_secs,
            }),
            Self::PayloadTooLarge { limit, size } => json!({
                "error": self.to_string(),
                "reason": reason,
                "maxSize": megabytes(*limit),
                "actualSize": size.map(megabytes),
            }),
            Self::ForbiddenContent(found) => {
                tracing::warn!(
                    field = %found.path,
                    pattern = found.pattern,
                    "rejected upload with forbidden content"
                );
                json!({
                    "error": self.to_string(),
                    "reason": reason,
                    "field": found.path,
                })
            }
            Self::Internal(KeeperError::InvalidRecord { reason: detail }) => json!({
                "error": detail,
                "reason": reason,
            }),
            Self::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                json!({ "error": "Internal server error", "reason": reason })
            }
            _ => json!({ "error": self.to_string(), "reason": reason }),
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimited { retry_after_secs } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}
