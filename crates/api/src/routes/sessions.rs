//! Session inspection endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use classroom_core::{EngagementState, SessionSnapshot, SessionSummary};

use crate::response::ApiError;
use crate::state::AppState;

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSnapshot>> {
    Json(state.controller.list().await)
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state
        .controller
        .snapshot(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("session {session_id} not found")))
}

/// GET /sessions/:id/engagement
pub async fn get_engagement(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<EngagementState>, ApiError> {
    state
        .controller
        .engagement(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("no engagement recorded for session {session_id}"))
        })
}

/// POST /sessions/:id/end
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let summary = state
        .controller
        .end(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("session {session_id} not found")))?;

    info!(%session_id, "Session ended over HTTP");
    Ok(Json(summary))
}
