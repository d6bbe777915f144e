//! HTTP API server for passage analysis

use super::errors::{panic_response, ApiError};
use crate::analyzer::{Analysis, Analyzer};
use crate::cache::InMemoryCache;
use crate::config::{DeploymentInfo, ServerConfig};
use crate::error::{LectioError, Result};
use crate::rate_limit::{RateLimitPolicy, SlidingWindowLimiter, ANONYMOUS_CLIENT};
use crate::services::{GeminiBackend, LlmBackend, LlmConfig};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, info_span, Instrument};

/// Proxy header carrying the originating client address
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Cache status response header
pub const X_CACHE: &str = "x-cache";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    /// Deadline applied around each analysis by the hosting layer
    request_timeout: Duration,
    deployment: DeploymentInfo,
    model: String,
    instance_id: String,
    started_at: Instant,
}

impl AppState {
    pub fn new(analyzer: Analyzer, request_timeout: Duration) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            request_timeout,
            deployment: DeploymentInfo::default(),
            model: String::new(),
            instance_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn with_deployment(mut self, deployment: DeploymentInfo, model: impl Into<String>) -> Self {
        self.deployment = deployment;
        self.model = model.into();
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

/// Build the router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Analysis (every method lands here so non-POST gets a 405 body)
        .route("/api/analyze", any(analyze_handler))
        // Diagnostics
        .route("/api/debug", get(debug_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        // Middleware
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
}

impl ApiServer {
    /// Create the server with in-memory cache and the server-side rate limit
    pub fn new(config: ServerConfig) -> Result<Self> {
        let backend = match config.api_key {
            Some(api_key) => {
                let backend = GeminiBackend::new(LlmConfig {
                    api_key,
                    model: config.model.clone(),
                    base_url: config.api_base_url.clone(),
                })?;
                Some(Arc::new(backend) as Arc<dyn LlmBackend>)
            }
            None => None,
        };

        let analyzer = Analyzer::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(SlidingWindowLimiter::new(RateLimitPolicy::server())),
            backend,
        );

        let state = AppState::new(analyzer, config.request_timeout)
            .with_deployment(config.deployment, config.model);

        Ok(Self {
            addr: config.addr,
            state,
        })
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve until interrupted
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(
            "API server [{}] listening on http://{}",
            self.state.instance_id, self.addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("API server [{}] stopped", self.state.instance_id);
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
    debug!("Shutdown signal received");
}

/// Client identity from the first `x-forwarded-for` hop
pub fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

/// Analysis handler
async fn analyze_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = client_id(&headers);
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
    let span = info_span!("analyze", request_id = %request_id, client = %client);

    async move {
        let outcome = tokio::time::timeout(
            state.request_timeout,
            state.analyzer.handle(&method, &client, &body),
        )
        .await
        .unwrap_or_else(|_| Err(LectioError::DeadlineExceeded(state.request_timeout)));

        match outcome {
            Ok(analysis) => analysis_response(analysis),
            Err(err) => ApiError(err).into_response(),
        }
    }
    .instrument(span)
    .await
}

fn analysis_response(analysis: Analysis) -> Response {
    (
        StatusCode::OK,
        [(X_CACHE, analysis.cache_status.as_header_value())],
        Json(analysis.result),
    )
        .into_response()
}

/// Diagnostic handler
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugResponse {
    status: String,
    version: String,
    instance_id: String,
    has_api_key: bool,
    model: String,
    #[serde(flatten)]
    deployment: DeploymentInfo,
    cache_entries: usize,
    uptime_seconds: u64,
}

async fn debug_handler(State(state): State<AppState>) -> Json<DebugResponse> {
    Json(DebugResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        has_api_key: state.analyzer.has_backend(),
        model: state.model.clone(),
        deployment: state.deployment.clone(),
        cache_entries: state.analyzer.cache().entry_count().await,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Health check handler
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
    })
}
