//! Security layer for the lightkeeper upload endpoint.
//!
//! The pieces run in this order on every upload:
//!
//! 1. [`identity`] -- derive a hashed caller identity from proxy headers.
//! 2. [`rate_limit`] -- fixed-window counter per identity (fails open).
//! 3. [`auth`] -- HMAC signature or legacy bearer token; composes
//!    [`nonce`] for replay protection (fails closed).
//! 4. [`sanitizer`] -- reject bodies carrying prototype-pollution keys or
//!    script injection strings.
//!
//! [`signature`] holds the signing primitives shared by the server and the
//! `keeper sign` / `keeper upload` client commands.

pub mod auth;
pub mod identity;
pub mod nonce;
pub mod rate_limit;
pub mod sanitizer;
pub mod signature;

pub use auth::{AuthError, AuthMethod, RequestAuthenticator};
pub use nonce::NonceGuard;
pub use rate_limit::{RateLimitResult, RateLimiter};
pub use sanitizer::{ForbiddenContent, PayloadSanitizer};
