//! Dashboard reads, insight refresh, competitors and health.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Harness, VIEWER, json_body, signed_config, upload_body};
use lightkeeper_services::{GenerationError, InsightGenerator};
use serde_json::{Value, json};

// ── Viewer gate ────────────────────────────────────────────────────

#[tokio::test]
async fn reads_require_a_viewer() {
    let h = Harness::new(signed_config());
    for uri in [
        "/api/reports",
        "/api/reports/pages",
        "/api/ai-insights",
        "/api/ai-insights/history",
        "/api/competitors/config",
    ] {
        let response = h
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn viewer_domain_restriction() {
    let mut config = signed_config();
    config.viewer.allowed_email_domain = Some("corp.example".into());
    let h = Harness::new(config);

    // VIEWER is @example.com
    let response = h.get_as_viewer("/api/reports").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = h
        .send(
            Request::get("/api/reports")
                .header("x-forwarded-email", "dev@corp.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ── Reports ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_dashboard() {
    let h = Harness::new(signed_config());
    let body = json_body(h.get_as_viewer("/api/reports").await).await;

    assert_eq!(body["latest"], Value::Null);
    assert_eq!(body["runs"], json!([]));
    assert_eq!(body["trends"]["mobile"], json!([]));
    assert_eq!(body["averages"]["performance"], 0);
}

#[tokio::test]
async fn runs_listed_newest_first_regardless_of_upload_order() {
    let h = Harness::new(signed_config());
    for ts in ["20240115-120000", "20240114-120000"] {
        let response = h.upload_signed(&upload_body(Some(ts))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body = json_body(h.get_as_viewer("/api/reports").await).await;
    assert_eq!(body["runs"][0]["timestamp"], "20240115-120000");
    assert_eq!(body["runs"][1]["timestamp"], "20240114-120000");
    assert_eq!(body["latest"]["scores"]["mobile"]["performance"], 90);

    let trend = body["trends"]["desktop"].as_array().unwrap();
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0]["date"], "2024-01-14");
    assert_eq!(trend[1]["date"], "2024-01-15");
    assert_eq!(trend[1]["bestPractices"], 95);
    // (80 + 96) / 2 across both runs
    assert_eq!(body["averages"]["performance"], 88);
}

#[tokio::test]
async fn retention_of_two_keeps_newest_two() {
    let mut config = signed_config();
    config.retention.reports_max_runs = 2;
    let h = Harness::new(config);

    for ts in ["20240101-000000", "20240102-000000", "20240103-000000"] {
        assert_eq!(
            h.upload_signed(&upload_body(Some(ts))).await.status(),
            StatusCode::OK
        );
    }

    let body = json_body(h.get_as_viewer("/api/reports").await).await;
    let runs: Vec<&str> = body["runs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(runs, vec!["20240103-000000", "20240102-000000"]);
    assert!(
        h.state
            .reports
            .get_run("20240101-000000")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn page_scores() {
    let h = Harness::new(signed_config());
    h.upload_signed(&upload_body(None)).await;

    let body = json_body(h.get_as_viewer("/api/reports/pages").await).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["pages"][0]["path"], "/");
    assert_eq!(body["pages"][1]["path"], "/about");

    let body = json_body(h.get_as_viewer("/api/reports/pages?path=/about").await).await;
    assert_eq!(body["page"]["url"], "https://example.com/about");

    let response = h.get_as_viewer("/api/reports/pages?path=/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── Insights ───────────────────────────────────────────────────────

struct FixedGenerator(Value);

#[async_trait]
impl InsightGenerator for FixedGenerator {
    async fn generate(&self) -> Result<Value, GenerationError> {
        Ok(self.0.clone())
    }
}

struct FailingGenerator;

#[async_trait]
impl InsightGenerator for FailingGenerator {
    async fn generate(&self) -> Result<Value, GenerationError> {
        Err(GenerationError("model unavailable".into()))
    }
}

fn refresh_request() -> Request<Body> {
    Request::post("/api/ai-insights/refresh")
        .header("x-forwarded-email", VIEWER)
        .body(Body::empty())
        .unwrap()
}

/// Wait for the spawned generation task to settle.
async fn wait_until_idle(h: &Harness) {
    for _ in 0..100 {
        if !h.state.insights.is_generating().await.unwrap() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("generation did not finish");
}

#[tokio::test]
async fn empty_insights() {
    let h = Harness::new(signed_config());
    let body = json_body(h.get_as_viewer("/api/ai-insights").await).await;
    assert_eq!(body["cacheStatus"], "empty");
    assert_eq!(body["isGenerating"], false);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn refresh_without_generator_is_unavailable() {
    let h = Harness::new(signed_config());
    let response = h.send(refresh_request()).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!h.state.insights.is_generating().await.unwrap());
}

#[tokio::test]
async fn refresh_generates_and_caches() {
    let analysis = json!({ "summary": "Fast site", "overallHealthScore": 91 });
    let generator = Arc::new(FixedGenerator(analysis.clone()));
    let h = Harness::with_state(signed_config(), |s| s.with_generator(generator));

    let response = h.send(refresh_request()).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["status"], "started");
    wait_until_idle(&h).await;

    let body = json_body(h.get_as_viewer("/api/ai-insights").await).await;
    assert_eq!(body["cacheStatus"], "fresh");
    assert_eq!(body["data"], analysis);
    assert_eq!(body["cachedAt"], "2024-01-15T12:00:00Z");

    h.clock.advance(chrono::Duration::hours(2) + chrono::Duration::seconds(1));
    let body = json_body(h.get_as_viewer("/api/ai-insights").await).await;
    assert_eq!(body["cacheStatus"], "stale");
    assert_eq!(body["data"], analysis);

    let history = json_body(h.get_as_viewer("/api/ai-insights/history").await).await;
    assert_eq!(history["count"], 1);
    assert_eq!(history["data"][0]["data"], analysis);
}

#[tokio::test]
async fn refresh_while_generating() {
    let generator = Arc::new(FixedGenerator(json!({})));
    let h = Harness::with_state(signed_config(), |s| s.with_generator(generator));
    h.state.insights.set_generating(true).await.unwrap();

    let response = h.send(refresh_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "already_generating");

    let body = json_body(h.get_as_viewer("/api/ai-insights").await).await;
    assert_eq!(body["cacheStatus"], "empty");
    assert_eq!(body["isGenerating"], true);
}

#[tokio::test]
async fn failed_generation_releases_lock() {
    let h = Harness::with_state(signed_config(), |s| {
        s.with_generator(Arc::new(FailingGenerator))
    });

    assert_eq!(
        h.send(refresh_request()).await.status(),
        StatusCode::ACCEPTED
    );
    wait_until_idle(&h).await;

    assert!(h.state.insights.get().await.unwrap().is_none());
    // The lock is free again.
    assert_eq!(
        h.send(refresh_request()).await.status(),
        StatusCode::ACCEPTED
    );
}

// ── Competitors ────────────────────────────────────────────────────

#[tokio::test]
async fn competitor_config_round_trip() {
    let h = Harness::new(signed_config());

    let response = h
        .send(
            Request::post("/api/competitors/config")
                .header("x-forwarded-email", VIEWER)
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "competitors": ["https://www.Rival.com/"] }).to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["config"]["competitors"],
        json!(["rival.com"])
    );

    let body = json_body(h.get_as_viewer("/api/competitors/config").await).await;
    assert_eq!(body["competitors"], json!(["rival.com"]));
    assert_eq!(body["keywords"], json!([]));
}

#[tokio::test]
async fn competitor_snapshot() {
    let h = Harness::new(signed_config());
    let body = json_body(h.get_as_viewer("/api/competitors").await).await;
    assert_eq!(body["cacheStatus"], "empty");

    h.state
        .competitors
        .set_snapshot(json!({ "gaps": [] }))
        .await
        .unwrap();
    let body = json_body(h.get_as_viewer("/api/competitors").await).await;
    assert_eq!(body["cacheStatus"], "fresh");
    assert_eq!(body["data"], json!({ "gaps": [] }));
}

// ── Health ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_store() {
    let h = Harness::new(signed_config());
    let response = h
        .send(Request::get("/api/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["kv"], "ok");
}
