//! Upload request authentication.
//!
//! Two methods, chosen by configuration rather than by what the client sends:
//!
//! - **HMAC** (whenever a signing key is configured): see
//!   [`signature`](crate::signature) for the scheme. Checks run in a fixed
//!   order and stop at the first failure: headers present, timestamp
//!   parses, timestamp within tolerance, nonce unused, signature matches.
//!   A failed HMAC check never falls back to the bearer token.
//! - **Bearer** (legacy, only without a signing key): `Authorization:
//!   Bearer <secret>` compared in constant time.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use lightkeeper_platform::{Clock, KvStore};
use lightkeeper_types::config::UploadConfig;
use lightkeeper_types::secret::SecretString;
use serde::Serialize;
use thiserror::Error;

use crate::nonce::NonceGuard;
use crate::signature::{
    NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, constant_time_eq, verify_signature,
};

/// How a request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Hmac,
    Bearer,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hmac => "hmac",
            Self::Bearer => "bearer",
        }
    }
}

/// Why a request was rejected. The `Display` text is returned to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("missing required headers: X-Timestamp, X-Nonce, X-Signature")]
    MissingHeaders,

    #[error("invalid timestamp format")]
    InvalidTimestamp,

    #[error("timestamp outside acceptable range ({tolerance_secs}s tolerance)")]
    TimestampOutOfRange { tolerance_secs: i64 },

    #[error("nonce already used or invalid (possible replay attack)")]
    NonceReused,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("missing or invalid Authorization header")]
    MissingBearer,

    #[error("invalid bearer token")]
    InvalidBearer,

    #[error(
        "no authentication method configured; set CI_UPLOAD_SIGNING_KEY (recommended) or CI_UPLOAD_SECRET"
    )]
    NotConfigured,
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeaders => "missing_headers",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::TimestampOutOfRange { .. } => "timestamp_out_of_range",
            Self::NonceReused => "nonce_reused",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingBearer => "missing_bearer",
            Self::InvalidBearer => "invalid_bearer",
            Self::NotConfigured => "not_configured",
        }
    }
}

pub struct RequestAuthenticator {
    signing_key: SecretString,
    bearer_secret: SecretString,
    tolerance_secs: i64,
    nonces: NonceGuard,
    clock: Arc<dyn Clock>,
}

impl RequestAuthenticator {
    pub fn new(
        signing_key: SecretString,
        bearer_secret: SecretString,
        tolerance_secs: i64,
        nonces: NonceGuard,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signing_key,
            bearer_secret,
            tolerance_secs,
            nonces,
            clock,
        }
    }

    /// Build from the upload section of the configuration.
    pub fn from_config(config: &UploadConfig, kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        let nonces = NonceGuard::new(
            kv,
            clock.clone(),
            Duration::from_secs(config.nonce_ttl_secs),
        );
        Self::new(
            config.signing_key.clone(),
            config.secret.clone(),
            config.timestamp_tolerance_secs,
            nonces,
            clock,
        )
    }

    /// The method this authenticator will demand, if any.
    pub fn method(&self) -> Option<AuthMethod> {
        if self.signing_key.is_configured() {
            Some(AuthMethod::Hmac)
        } else if self.bearer_secret.is_configured() {
            Some(AuthMethod::Bearer)
        } else {
            None
        }
    }

    /// Authenticate a request from its headers and raw body.
    pub async fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Result<AuthMethod, AuthError> {
        match self.method() {
            Some(AuthMethod::Hmac) => self.verify_hmac(headers, body).await.map(|()| AuthMethod::Hmac),
            Some(AuthMethod::Bearer) => {
                tracing::warn!(
                    "using legacy bearer token authentication; set CI_UPLOAD_SIGNING_KEY to switch to HMAC signatures"
                );
                self.verify_bearer(headers).map(|()| AuthMethod::Bearer)
            }
            None => Err(AuthError::NotConfigured),
        }
    }

    async fn verify_hmac(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let (Some(timestamp), Some(nonce), Some(signature)) = (
            header_str(headers, TIMESTAMP_HEADER),
            header_str(headers, NONCE_HEADER),
            header_str(headers, SIGNATURE_HEADER),
        ) else {
            return Err(AuthError::MissingHeaders);
        };

        let request_time: i64 = timestamp
            .parse()
            .map_err(|_| AuthError::InvalidTimestamp)?;
        let now = self.clock.now().timestamp();
        let skew = now.checked_sub(request_time).map(i64::unsigned_abs);
        if skew.is_none_or(|s| s > self.tolerance_secs.unsigned_abs()) {
            return Err(AuthError::TimestampOutOfRange {
                tolerance_secs: self.tolerance_secs,
            });
        }

        if !self.nonces.check_and_store(nonce).await {
            return Err(AuthError::NonceReused);
        }

        if !verify_signature(
            self.signing_key.expose().as_bytes(),
            timestamp,
            nonce,
            body,
            signature,
        ) {
            return Err(AuthError::InvalidSignature);
        }
        Ok(())
    }

    fn verify_bearer(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let provided = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingBearer)?;
        let expected = self.bearer_secret.expose().as_bytes();
        let provided = provided.as_bytes();
        if !constant_time_eq(provided, expected) {
            return Err(AuthError::InvalidBearer);
        }
        Ok(())
    }
}

/// A present, non-empty, visible-ASCII header value.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
