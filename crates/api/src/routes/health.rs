//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::health;
use tracing::warn;

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    // Refresh the learning store probe so the report reflects the backend now.
    match state.controller.ping_store().await {
        Ok(()) => health().learning_store.set_healthy(),
        Err(e) => {
            warn!(error = %e, "Learning store ping failed");
            health().learning_store.set_unhealthy(e.to_string());
        }
    }

    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        learning_store_connected: health().learning_store.is_healthy(),
        content_connected: health().content.is_healthy(),
        active_sessions: state.controller.session_count(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
