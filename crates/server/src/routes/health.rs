use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use csmp::Stage;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "csmp-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

fn component<T>(stage: &Stage<T>) -> Value {
    match stage.error() {
        None => json!({ "status": "ready" }),
        Some(reason) => json!({ "status": "unavailable", "error": reason }),
    }
}

/// Readiness check endpoint
///
/// Always 200: uploads are accepted even when a backend is down, so the
/// overall status is `degraded` rather than an error.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let encoder = state.orchestrator.encoder();
    let search = state.orchestrator.search();
    let status = if encoder.is_ready() && search.is_ready() {
        "ready"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "service": "csmp-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "api": { "status": "ready" },
            "encoder": component(encoder),
            "search": component(search),
        }
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.metrics.as_ref().ok_or(ServerError::NotFound)?;
    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
