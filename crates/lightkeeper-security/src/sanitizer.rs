//! Forbidden-content screening for upload bodies.
//!
//! The decoded JSON is walked depth-first (array elements in index order,
//! object entries in document order). Every object key and every string value
//! is tested against a fixed pattern list; the first hit is returned and
//! the walk stops. A key is tested before its value.
//!
//! The patterns target prototype-pollution keys and script injection in
//! strings that the dashboard later renders.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Pattern sources, in the order they are tested.
const PATTERNS: &[&str] = &[
    r"^__proto__$",
    r"^constructor$",
    r"^prototype$",
    r"(?i)<script[\s>]",
    r"(?i)javascript:",
    r"(?i)on[a-z0-9_]+\s*=",
];

static COMPILED: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|p| (*p, Regex::new(p).expect("forbidden-content pattern compiles")))
        .collect()
});

/// Where forbidden content was found and which pattern matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForbiddenContent {
    /// Location in the document: `latest.scores`, `reports[2].url`, or
    /// `(value)` for a bare top-level string.
    pub path: String,
    /// Source of the matching pattern.
    pub pattern: &'static str,
}

impl fmt::Display for ForbiddenContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forbidden content at {} (pattern {})", self.path, self.pattern)
    }
}

/// Screens decoded JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadSanitizer;

impl PayloadSanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Return the first forbidden key or string in `value`, if any.
    pub fn scan(&self, value: &Value) -> Option<ForbiddenContent> {
        let mut path = String::new();
        walk(value, &mut path)
    }
}

fn first_match(text: &str) -> Option<&'static str> {
    COMPILED
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(src, _)| *src)
}

fn walk(value: &Value, path: &mut String) -> Option<ForbiddenContent> {
    match value {
        Value::String(s) => first_match(s).map(|pattern| ForbiddenContent {
            path: if path.is_empty() {
                "(value)".to_owned()
            } else {
                path.clone()
            },
            pattern,
        }),
        Value::Array(items) => items.iter().enumerate().find_map(|(i, item)| {
            let len = path.len();
            path.push_str(&format!("[{i}]"));
            let found = walk(item, path);
            path.truncate(len);
            found
        }),
        Value::Object(map) => map.iter().find_map(|(key, item)| {
            let len = path.len();
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(key);
            let found = match first_match(key) {
                Some(pattern) => Some(ForbiddenContent {
                    path: path.clone(),
                    pattern,
                }),
                None => walk(item, path),
            };
            path.truncate(len);
            found
        }),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scan(value: Value) -> Option<ForbiddenContent> {
        PayloadSanitizer::new().scan(&value)
    }

    #[test]
    fn proto_key_rejected() {
        let found = scan(json!({ "__proto__": { "x": 1 } })).unwrap();
        assert_eq!(found.path, "__proto__");
        assert_eq!(found.pattern, "^__proto__$");
    }

    #[test]
    fn proto_key_rejected_when_parsed_from_text() {
        let value: Value = serde_json::from_str(r#"{"__proto__": {"x": 1}}"#).unwrap();
        let found = PayloadSanitizer::new().scan(&value).unwrap();
        assert_eq!(found.path, "__proto__");
    }

    #[test]
    fn script_value_rejected() {
        let found = scan(json!({ "bio": "hello <script>alert(1)</script>" })).unwrap();
        assert_eq!(found.path, "bio");
        assert_eq!(found.pattern, r"(?i)<script[\s>]");
    }

    #[test]
    fn clean_document_passes() {
        assert!(scan(json!({ "name": "Alice" })).is_none());
        assert!(
            scan(json!({
                "latest": {
                    "timestamp": "2024-01-15T12:00:00Z",
                    "scores": { "mobile": { "performance": 90, "seo": 100 } },
                    "pageScores": [{ "path": "/", "url": "https://example.com/" }]
                }
            }))
            .is_none()
        );
    }

    #[test]
    fn nested_paths() {
        let found = scan(json!({
            "run": { "reports": [ { "url": "ok" }, { "url": "JavaScript:alert(1)" } ] }
        }))
        .unwrap();
        assert_eq!(found.path, "run.reports[1].url");
        assert_eq!(found.pattern, "(?i)javascript:");
    }

    #[test]
    fn nested_key_path() {
        let found = scan(json!({ "a": { "constructor": 1 } })).unwrap();
        assert_eq!(found.path, "a.constructor");
    }

    #[test]
    fn root_string_and_array() {
        assert_eq!(scan(json!("<script>")).unwrap().path, "(value)");
        assert_eq!(scan(json!(["fine", "prototype"])).unwrap().path, "[1]");
    }

    #[test]
    fn event_handler_attribute() {
        let found = scan(json!({ "html": "<img src=x OnError = alert(1)>" })).unwrap();
        assert_eq!(found.pattern, r"(?i)on[a-z0-9_]+\s*=");
        assert!(scan(json!({ "text": "one two" })).is_none());
    }

    #[test]
    fn key_checked_before_value() {
        let found = scan(json!({ "onclick=": "<script>" })).unwrap();
        assert_eq!(found.path, "onclick=");
        assert_eq!(found.pattern, r"(?i)on[a-z0-9_]+\s*=");
    }

    #[test]
    fn patterns_are_anchored_where_intended() {
        assert!(scan(json!({ "my_constructor": 1 })).is_none());
        assert!(scan(json!({ "prototypes": "constructor call" })).is_none());
    }

    #[test]
    fn first_hit_in_document_order() {
        let value: Value =
            serde_json::from_str(r#"{"z": "<script>x", "a": "javascript:y"}"#).unwrap();
        let found = PayloadSanitizer::new().scan(&value).unwrap();
        assert_eq!(found.path, "z");
        assert_eq!(found.pattern, r"(?i)<script[\s>]");
    }
}
