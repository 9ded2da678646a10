//! Caller identity for rate limiting.
//!
//! lightkeeper runs behind a reverse proxy, so the peer address is the
//! proxy's. The client address comes from `X-Forwarded-For` (first hop),
//! then `X-Real-IP`. It is hashed before it becomes part of a store key so
//! raw addresses are never persisted.

use http::HeaderMap;
use sha2::{Digest, Sha256};

/// Identity used when no proxy header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client address from proxy headers.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_owned()
}

/// Stable, non-reversible identifier: `ip-` + first 8 bytes of SHA-256, hex.
pub fn hash_identifier(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    format!("ip-{}", hex::encode(&digest[..8]))
}

/// [`client_ip`] then [`hash_identifier`].
pub fn client_identity(headers: &HeaderMap) -> String {
    hash_identifier(&client_ip(headers))
}
