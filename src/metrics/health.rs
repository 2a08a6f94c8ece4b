//! Health check endpoints and Prometheus metrics
//!
//! These routes are merged into the same router as the game socket, so one
//! listener serves both.

use crate::metrics::collector::MetricsCollector;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::session::SessionServer;
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state for the status endpoints
#[derive(Clone)]
pub struct HealthServerState {
    pub session_server: Arc<SessionServer>,
    pub service_name: String,
    pub game_path: String,
    pub started_at: DateTime<Utc>,
}

impl HealthServerState {
    pub fn new(session_server: Arc<SessionServer>, service_name: &str, game_path: &str) -> Self {
        Self {
            session_server,
            service_name: service_name.to_string(),
            game_path: game_path.to_string(),
            started_at: Utc::now(),
        }
    }

    fn check(&self) -> HealthCheck {
        HealthCheck::check(&self.session_server, &self.service_name, self.started_at)
    }
}

/// Paths owned by the status router; the game socket cannot share them
pub const STATUS_PATHS: [&str; 4] = ["/", "/health", "/metrics", "/stats"];

/// Router with `/`, `/health`, `/metrics` and `/stats`
pub fn health_routes(state: HealthServerState) -> Router {
    let [root, health, metrics, stats] = STATUS_PATHS;
    Router::new()
        .route(root, get(root_handler))
        .route(health, get(health_handler))
        .route(metrics, get(metrics_handler))
        .route(stats, get(stats_handler))
        .with_state(state)
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    Json(json!({
        "service": state.service_name,
        "version": crate::VERSION,
        "endpoints": [
            state.game_path,
            "/health",
            "/metrics",
            "/stats"
        ]
    }))
}

async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Health check requested");

    let health = state.check();
    let code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(json!({
            "status": health.status,
            "service": state.service_name,
            "version": crate::VERSION
        })),
    )
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<HealthServerState>) -> Response {
    debug!("Metrics endpoint requested");

    match encode_metrics(&state.session_server.metrics_collector()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// Detailed service statistics for humans
async fn stats_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    let health = state.check();
    Json(json!({
        "service": {
            "name": health.service,
            "version": health.version,
            "status": health.status,
            "uptime_seconds": health.stats.uptime_seconds
        },
        "connections": health.stats.connections,
        "queue": {
            "waiting": health.stats.players_waiting
        },
        "matches": {
            "active": health.stats.active_matches,
            "created": health.stats.matches_created,
            "ended": health.stats.matches_ended,
            "moves_relayed": health.stats.moves_relayed
        },
        "components": health.checks,
        "timestamp": health.timestamp
    }))
}

/// Metrics in the Prometheus text format
pub fn encode_metrics(metrics_collector: &MetricsCollector) -> Result<String> {
    let metric_families = metrics_collector.registry().gather();
    TextEncoder::new()
        .encode_to_string(&metric_families)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))
}
