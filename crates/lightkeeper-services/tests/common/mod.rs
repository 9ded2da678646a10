//! Shared harness: the full router over an in-memory store and a manual
//! clock.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use lightkeeper_platform::{ManualClock, MemoryKvStore};
use lightkeeper_security::signature::sign_request;
use lightkeeper_services::{ApiState, build_router};
use lightkeeper_types::config::KeeperConfig;
use lightkeeper_types::secret::SecretString;
use serde_json::Value;
use tower::ServiceExt;

pub const SIGNING_KEY: &str = "test-signing-key";
pub const VIEWER: &str = "ops@example.com";

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub kv: Arc<MemoryKvStore>,
    pub state: ApiState,
    router: Router,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Default configuration with HMAC signing enabled.
pub fn signed_config() -> KeeperConfig {
    let mut config = KeeperConfig::default();
    config.upload.signing_key = SecretString::new(SIGNING_KEY);
    config
}

impl Harness {
    pub fn new(config: KeeperConfig) -> Self {
        Self::with_state(config, |state| state)
    }

    pub fn with_state(config: KeeperConfig, customize: impl FnOnce(ApiState) -> ApiState) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let kv = Arc::new(MemoryKvStore::new(clock.clone()));
        let state = customize(ApiState::new(config, kv.clone(), clock.clone()));
        let router = build_router(state.clone());
        Self {
            clock,
            kv,
            state,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// POST a body signed with [`SIGNING_KEY`] at the current clock time.
    pub async fn upload_signed(&self, body: &str) -> Response<Body> {
        self.send(self.signed_request(body, self.clock_now())).await
    }

    pub fn signed_request(&self, body: &str, at: DateTime<Utc>) -> Request<Body> {
        let signed = sign_request(SIGNING_KEY.as_bytes(), body.as_bytes(), at);
        let mut builder = Request::post("/api/reports/upload")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7");
        for (name, value) in signed.pairs() {
            builder = builder.header(name, value);
        }
        builder.body(Body::from(body.to_owned())).unwrap()
    }

    /// GET as an authorized dashboard viewer.
    pub async fn get_as_viewer(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header("x-forwarded-email", VIEWER)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use lightkeeper_platform::Clock;
        self.clock.now()
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Minimal upload body with a run identified by `run_ts`.
pub fn upload_body(run_ts: Option<&str>) -> String {
    let latest = serde_json::json!({
        "timestamp": "2024-01-15T12:00:00Z",
        "scores": {
            "mobile": { "performance": 90, "accessibility": 95, "best-practices": 100, "seo": 98 }
        },
        "pageScores": [
            { "path": "/about", "url": "https://example.com/about", "scores": {} },
            { "path": "/", "url": "https://example.com/", "scores": {} }
        ]
    });
    let mut body = serde_json::json!({ "latest": latest });
    if let Some(ts) = run_ts {
        body["run"] = serde_json::json!({
            "timestamp": ts,
            "reports": [{
                "timestamp": ts,
                "url": "https://example.com/",
                "scores": {
                    "mobile": { "performance": 80, "accessibility": 90, "best-practices": 95, "seo": 100 },
                    "desktop": { "performance": 96, "accessibility": 90, "best-practices": 95, "seo": 100 }
                }
            }]
        });
    }
    body.to_string()
}
