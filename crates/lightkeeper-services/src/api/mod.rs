//! REST API for the lightkeeper dashboard.
//!
//! The upload endpoint is authenticated by [`RequestAuthenticator`]; every
//! dashboard read goes through a [`ViewerGate`]. The AI generator is an
//! external collaborator reached through [`InsightGenerator`].

pub mod competitors;
pub mod handlers;
pub mod insights;
pub mod reports;
pub mod upload;
pub mod viewer;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use lightkeeper_core::{CompetitorStore, InsightCache, ReportStore};
use lightkeeper_platform::{Clock, KvStore};
use lightkeeper_security::{PayloadSanitizer, RateLimiter, RequestAuthenticator};
use lightkeeper_types::config::KeeperConfig;
use serde_json::Value;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use viewer::{HeaderViewerGate, Viewer, ViewerGate};

/// Key prefix of the upload rate-limit counters.
pub const UPLOAD_RATE_LIMIT_PREFIX: &str = "ratelimit:upload";

/// Why an insight generation failed.
#[derive(Error, Debug)]
#[error("insight generation failed: {0}")]
pub struct GenerationError(pub String);

/// Produces a fresh AI analysis. Runs off the request path.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self) -> Result<Value, GenerationError>;
}

/// Shared state accessible by all API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<KeeperConfig>,
    pub kv: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub sanitizer: PayloadSanitizer,
    pub reports: Arc<ReportStore>,
    pub insights: Arc<InsightCache>,
    pub competitors: Arc<CompetitorStore>,
    pub viewer_gate: Arc<dyn ViewerGate>,
    /// `None` disables insight refresh.
    pub generator: Option<Arc<dyn InsightGenerator>>,
}

impl ApiState {
    /// Wire every component from a validated configuration.
    pub fn new(config: KeeperConfig, kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        let authenticator =
            RequestAuthenticator::from_config(&config.upload, kv.clone(), clock.clone());
        let rate_limiter = RateLimiter::new(kv.clone(), clock.clone(), UPLOAD_RATE_LIMIT_PREFIX);
        let reports = ReportStore::from_config(&config.retention, kv.clone());
        let insights = InsightCache::new(
            kv.clone(),
            clock.clone(),
            &config.insights,
            &config.retention,
        );
        let competitors = CompetitorStore::new(kv.clone(), clock.clone(), &config.caches);
        let viewer_gate = HeaderViewerGate::from_config(&config.viewer);

        Self {
            config: Arc::new(config),
            kv,
            clock,
            authenticator: Arc::new(authenticator),
            rate_limiter: Arc::new(rate_limiter),
            sanitizer: PayloadSanitizer::new(),
            reports: Arc::new(reports),
            insights: Arc::new(insights),
            competitors: Arc::new(competitors),
            viewer_gate: Arc::new(viewer_gate),
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn InsightGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_viewer_gate(mut self, gate: Arc<dyn ViewerGate>) -> Self {
        self.viewer_gate = gate;
        self
    }
}

/// Build the API router with all routes.
pub fn build_router(state: ApiState) -> Router {
    let cors_origins = &state.config.server.cors_origins;
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .nest("/api", handlers::api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
