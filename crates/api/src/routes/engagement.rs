use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use classroom_core::{is_valid_id, EngagementTrends};

use crate::response::ApiError;
use crate::state::AppState;

/// Trend window when the caller gives none.
const DEFAULT_TREND_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TrendQuery {
    fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let to = self.to.unwrap_or(now);
        let from = self
            .from
            .unwrap_or(to - Duration::days(DEFAULT_TREND_WINDOW_DAYS));
        (from, to)
    }
}

/// GET /classes/:id/engagement/trends?from=&to=
pub async fn class_trends(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<EngagementTrends>, ApiError> {
    if !is_valid_id(&class_id) {
        return Err(ApiError::bad_request("invalid class id"));
    }

    let (from, to) = query.window(Utc::now());
    if from > to {
        return Err(ApiError::bad_request("from must not be after to"));
    }

    let trends = state.controller.engagement_trends(&class_id, from, to).await?;
    Ok(Json(trends))
}
