//! HTTP transport for the able-mind MCP server
//!
//! MCP over Streamable HTTP at the configured path, plain JSON mirrors of
//! the client-facing functions under `/api`, and health/info/metrics.
//! Everything except `/health` sits behind bearer authentication.

use axum::{
    Json, Router,
    body::Body,
    error_handling::HandleErrorLayer,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager,
    tower::{StreamableHttpServerConfig, StreamableHttpService},
};
use serde::Deserialize;
use serde_json::json;
use std::{cmp::Ordering, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower::{BoxError, ServiceBuilder, timeout::TimeoutLayer};
use tower_http::cors::{Any, CorsLayer};

use crate::actions::ReportRequest;
use crate::clients::LanguageModel;
use crate::error::Result;
use crate::server::AbleMindServer;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub server: AbleMindServer,
    pub metrics: Arc<Mutex<HttpMetrics>>,
    pub session_mgr: Arc<LocalSessionManager>,
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: unix_now(),
            errors_total: 0,
            latencies: Vec::with_capacity(256),
        }
    }

    fn record(&mut self, latency_ms: f64, ok: bool) {
        if latency_ms > 0.0 {
            self.latencies.push(latency_ms);
            if self.latencies.len() > 256 {
                self.latencies.remove(0);
            }
        }
        if !ok {
            self.errors_total = self.errors_total.saturating_add(1);
        }
        self.total_requests = self.total_requests.saturating_add(1);
        self.last_request_unix = unix_now();
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, "application/json")],
        json!({"error": {"code": 401, "message": "Unauthorized"}}).to_string(),
    )
        .into_response()
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let server = &state.server;
    let config = &server.config;
    let store_ok = server.store.health_check().await.is_ok();

    Json(json!({
        "model": {
            "provider": config.model.provider,
            "name": server.model.name(),
            "timeout_ms": config.model.timeout_ms
        },
        "store": {
            "backend": server.store.backend(),
            "ns": config.system.database_ns,
            "db": config.system.database_db,
            "connected": store_ok
        },
        "assessment": {
            "total_challenges": config.assessment.total_challenges,
            "initial_difficulty": config.assessment.initial_difficulty,
            "active_runs": server.active_runs().await
        },
        "server": {
            "transport": config.runtime.transport,
            "bind": config.runtime.http_bind.to_string(),
            "uptime_secs": server.started_at.elapsed().as_secs()
        }
    }))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    let active_sessions = state.session_mgr.sessions.read().await.len();

    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
        (Some(avg), sorted.get(p95_idx).copied())
    };

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "last_request_unix": metrics.last_request_unix,
        "http_active_sessions": active_sessions,
        "errors_total": metrics.errors_total,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms
    }))
}

#[derive(Debug, Deserialize)]
pub struct InitialChallengeBody {
    pub context: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextChallengeBody {
    pub context: String,
    pub current_difficulty: i64,
    pub user_performance: i64,
    #[serde(default)]
    pub challenge_type: Option<String>,
}

pub async fn initial_challenge_handler(
    State(state): State<HttpState>,
    Json(body): Json<InitialChallengeBody>,
) -> impl IntoResponse {
    Json(state.server.actions.get_initial_challenge(&body.context).await)
}

pub async fn next_challenge_handler(
    State(state): State<HttpState>,
    Json(body): Json<NextChallengeBody>,
) -> impl IntoResponse {
    let challenge_type = body.challenge_type.as_deref().unwrap_or("reasoning");
    Json(
        state
            .server
            .actions
            .submit_and_get_next_challenge(
                &body.context,
                body.current_difficulty,
                body.user_performance,
                challenge_type,
            )
            .await,
    )
}

pub async fn report_handler(
    State(state): State<HttpState>,
    Json(body): Json<ReportRequest>,
) -> impl IntoResponse {
    Json(state.server.actions.generate_report(body).await)
}

async fn handle_api_error(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({"success": false, "error": "Request timed out."})),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
    }
}

/// Assemble all routes and layers; separated from binding for tests
pub fn build_router(server: AbleMindServer) -> Router {
    let session_mgr = Arc::new(LocalSessionManager::default());
    let state = HttpState {
        server: server.clone(),
        metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        session_mgr: session_mgr.clone(),
    };

    // Build MCP streamable HTTP service mounted at configured path
    let path = server.config.runtime.http_path.clone();
    let keepalive = Duration::from_secs(server.config.runtime.http_sse_keepalive_sec);
    let server_factory = server.clone();
    let mcp_service: StreamableHttpService<AbleMindServer, _> = StreamableHttpService::new(
        move || Ok(server_factory.clone()),
        session_mgr,
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: Some(keepalive),
            ..Default::default()
        },
    );

    let api_timeout = Duration::from_millis(server.config.runtime.http_request_timeout_ms);
    let api = Router::new()
        .route("/initial-challenge", post(initial_challenge_handler))
        .route("/next-challenge", post(next_challenge_handler))
        .route("/report", post(report_handler))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_api_error))
                .layer(TimeoutLayer::new(api_timeout)),
        );

    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .nest_service(path.as_str(), mcp_service)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let tracked = req.uri().path() != "/health";
                let start = std::time::Instant::now();
                let resp = next.run(req).await;
                if tracked {
                    let latency_ms = start.elapsed().as_millis() as f64;
                    metrics
                        .lock()
                        .await
                        .record(latency_ms, resp.status().is_success());
                }
                resp
            },
        ))
        .layer(middleware::from_fn_with_state(
            server.config.runtime.bearer_token.clone(),
            |State(token): State<Option<String>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                // Allow /health without auth
                if req.uri().path() == "/health" {
                    return next.run(req).await;
                }
                let Some(expected) = token else {
                    return unauthorized();
                };
                let headers: &HeaderMap = req.headers();
                let header_ok = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .is_some_and(|v| v == expected);
                if !header_ok {
                    return unauthorized();
                }
                next.run(req).await
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(server: AbleMindServer) -> Result<()> {
    if server.config.runtime.bearer_token.is_none() {
        tracing::warn!("ABLE_BEARER_TOKEN is not set; every route except /health will return 401");
    }

    let bind = server.config.runtime.http_bind;
    let mcp_path = server.config.runtime.http_path.clone();
    let app = build_router(server);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {} (MCP at {})", bind, mcp_path);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
