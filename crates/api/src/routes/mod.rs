//! API routes.

pub mod engagement;
pub mod health;
pub mod mastery;
pub mod metrics;
pub mod sessions;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/sessions/:id/engagement", get(sessions::get_engagement))
        .route("/sessions/:id/end", post(sessions::end_session))
        .route("/students/:id/mastery", get(mastery::student_mastery))
        .route("/concepts/:id/mastery", get(mastery::class_mastery))
        .route(
            "/classes/:id/engagement/trends",
            get(engagement::class_trends),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
