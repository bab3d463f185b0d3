use axum::{extract::State, Json};
use serde::Serialize;
use telemetry::{metrics, MetricsSnapshot};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
}

/// GET /metrics - In-process counters as JSON.
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        metrics: metrics().snapshot(),
    })
}
