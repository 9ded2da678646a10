//! Redacting wrapper for upload credentials.
//!
//! [`SecretString`] holds the HMAC signing key and the legacy bearer secret.
//! It never appears in logs, `Debug` output, or serialized configuration,
//! so `keeper config` can print the resolved config safely.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A credential that must not leak through formatting or serialization.
///
/// An empty value means "not configured"; see [`SecretString::is_configured`].
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential. Only call this where the bytes are actually used
    /// (MAC keys, constant-time comparisons).
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` when a non-empty credential is present.
    pub fn is_configured(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_configured() {
            f.write_str("\"[REDACTED]\"")
        } else {
            f.write_str("\"\"")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_configured() {
            f.write_str("[REDACTED]")
        } else {
            Ok(())
        }
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let shown = if self.is_configured() { "[REDACTED]" } else { "" };
        serializer.serialize_str(shown)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_owned())
    }
}
