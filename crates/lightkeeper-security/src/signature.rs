//! Upload request signing.
//!
//! A signed upload carries three headers:
//!
//! - `X-Timestamp` -- Unix time in seconds.
//! - `X-Nonce` -- a random, single-use value (a UUID in practice).
//! - `X-Signature` -- lowercase hex of
//!   `HMAC-SHA256(key, "{timestamp}.{nonce}.{hex sha256(body)}")`.
//!
//! Hashing the body first keeps the signed base string small and means the
//! signature covers every byte of the body exactly as sent.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const NONCE_HEADER: &str = "x-nonce";
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Lowercase hex SHA-256 of the raw body.
pub fn body_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// The string that gets MACed.
pub fn signature_base(timestamp: &str, nonce: &str, body: &[u8]) -> String {
    format!("{timestamp}.{nonce}.{}", body_hash(body))
}

/// Compute the hex signature for a request.
pub fn compute_signature(key: &[u8], timestamp: &str, nonce: &str, body: &[u8]) -> String {
    let Some(mac) = keyed_mac(key, timestamp, nonce, body) else {
        return String::new();
    };
    hex::encode(mac.finalize().into_bytes())
}

/// Check `signature` (hex) against the expected MAC in constant time.
///
/// Malformed hex and length mismatches are plain failures.
pub fn verify_signature(
    key: &[u8],
    timestamp: &str,
    nonce: &str,
    body: &[u8],
    signature: &str,
) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Some(mac) = keyed_mac(key, timestamp, nonce, body) else {
        return false;
    };
    mac.verify_slice(&provided).is_ok()
}

/// HMAC over the base string. HMAC takes keys of any length, so `None` is
/// not expected; callers treat it as "no valid signature".
fn keyed_mac(key: &[u8], timestamp: &str, nonce: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(signature_base(timestamp, nonce, body).as_bytes());
    Some(mac)
}

/// Constant-time byte comparison.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// The three header values of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

impl SignedHeaders {
    /// `(name, value)` pairs ready to attach to a request.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (TIMESTAMP_HEADER, self.timestamp.as_str()),
            (NONCE_HEADER, self.nonce.as_str()),
            (SIGNATURE_HEADER, self.signature.as_str()),
        ]
    }
}

/// Sign `body` at `now` with a fresh random nonce.
pub fn sign_request(key: &[u8], body: &[u8], now: DateTime<Utc>) -> SignedHeaders {
    sign_request_with_nonce(key, body, now, &uuid::Uuid::new_v4().to_string())
}

/// Sign `body` with a caller-chosen nonce.
pub fn sign_request_with_nonce(
    key: &[u8],
    body: &[u8],
    now: DateTime<Utc>,
    nonce: &str,
) -> SignedHeaders {
    let timestamp = now.timestamp().to_string();
    let signature = compute_signature(key, &timestamp, nonce, body);
    SignedHeaders {
        timestamp,
        nonce: nonce.to_owned(),
        signature,
    }
}
