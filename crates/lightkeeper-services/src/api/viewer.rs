//! Dashboard viewer authorization.
//!
//! Sign-in happens in front of lightkeeper, in an OAuth proxy that injects
//! the signed-in email as a request header. The gate only decides whether
//! that identity may read the dashboard.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use lightkeeper_types::config::ViewerConfig;

use super::ApiState;
use crate::error::ApiError;

/// An authorized dashboard viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub email: String,
}

/// Decides who may read the dashboard.
pub trait ViewerGate: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> Option<Viewer>;
}

/// Trusts an identity header set by the fronting proxy, optionally
/// restricted to one email domain.
#[derive(Debug, Clone)]
pub struct HeaderViewerGate {
    header: String,
    allowed_domain: Option<String>,
}

impl HeaderViewerGate {
    pub fn new(header: impl Into<String>, allowed_domain: Option<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
            allowed_domain: allowed_domain.map(|d| d.trim_start_matches('@').to_ascii_lowercase()),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(
            config.identity_header.clone(),
            config.allowed_email_domain.clone(),
        )
    }
}

impl ViewerGate for HeaderViewerGate {
    fn authorize(&self, headers: &HeaderMap) -> Option<Viewer> {
        let email = headers
            .get(self.header.as_str())?
            .to_str()
            .ok()?
            .trim()
            .to_ascii_lowercase();
        let (_, domain) = email.rsplit_once('@')?;
        if domain.is_empty() {
            return None;
        }
        if let Some(allowed) = &self.allowed_domain
            && domain != allowed
        {
            tracing::debug!(domain, "viewer domain not allowed");
            return None;
        }
        Some(Viewer { email })
    }
}

impl FromRequestParts<ApiState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        state
            .viewer_gate
            .authorize(&parts.headers)
            .ok_or(ApiError::Unauthorized)
    }
}
