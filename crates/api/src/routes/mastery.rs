//! Mastery read endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use classroom_core::{is_valid_id, ClassMastery, MasteryLevel, MasteryScore};

use crate::response::ApiError;
use crate::state::AppState;

/// One concept score with its level.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMastery {
    pub concept_id: String,
    pub score: u8,
    pub level: MasteryLevel,
    pub accuracy: u8,
    pub consistency: u8,
    pub speed: u8,
    pub attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
}

impl From<&MasteryScore> for ConceptMastery {
    fn from(score: &MasteryScore) -> Self {
        Self {
            concept_id: score.concept_id.clone(),
            score: score.overall_score,
            level: score.level(),
            accuracy: score.accuracy,
            consistency: score.consistency,
            speed: score.speed,
            attempts: score.attempts,
            last_attempt_at: score.last_attempt_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMasteryResponse {
    pub student_id: String,
    pub concepts: Vec<ConceptMastery>,
}

#[derive(Debug, Deserialize)]
pub struct ClassMasteryQuery {
    /// Comma-separated student ids.
    pub students: Option<String>,
}

/// GET /students/:id/mastery
pub async fn student_mastery(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<StudentMasteryResponse>, ApiError> {
    if !is_valid_id(&student_id) {
        return Err(ApiError::bad_request("invalid student id"));
    }

    let scores = state.controller.student_mastery(&student_id).await?;
    Ok(Json(StudentMasteryResponse {
        student_id,
        concepts: scores.iter().map(ConceptMastery::from).collect(),
    }))
}

/// GET /concepts/:id/mastery?students=a,b,c
pub async fn class_mastery(
    State(state): State<AppState>,
    Path(concept_id): Path<String>,
    Query(query): Query<ClassMasteryQuery>,
) -> Result<Json<ClassMastery>, ApiError> {
    if !is_valid_id(&concept_id) {
        return Err(ApiError::bad_request("invalid concept id"));
    }

    let students = parse_student_list(query.students.as_deref())?;
    let summary = state.controller.class_mastery(&concept_id, &students).await?;
    Ok(Json(summary))
}

fn parse_student_list(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let Some(raw) = raw else {
        return Err(ApiError::bad_request("students query parameter is required"));
    };

    let students: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let invalid: Vec<String> = students
        .iter()
        .filter(|s| !is_valid_id(s))
        .map(|s| format!("invalid student id: {s}"))
        .collect();
    if !invalid.is_empty() {
        return Err(ApiError::validation("VALID_002", invalid));
    }

    Ok(students)
}
