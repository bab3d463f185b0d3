//! Row types and conversions between core records and ClickHouse rows.
//!
//! Timestamps travel as milliseconds since epoch (`DateTime64(3)`).

use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::{Deserialize, Serialize};

use classroom_core::{EngagementLog, Error, MasteryHistoryEntry, MasteryScore, Result};

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EngagementLogRow {
    pub session_id: String,
    pub class_id: String,
    pub teacher_id: String,
    pub concept_id: String,
    pub timestamp: i64,
    pub participation_rate: f64,
    pub engagement_level: String,
    pub active_students: u32,
    pub total_students: u32,
    pub average_response_time: f64,
    pub correct_response_rate: f64,
}

impl From<&EngagementLog> for EngagementLogRow {
    fn from(log: &EngagementLog) -> Self {
        Self {
            session_id: log.session_id.clone(),
            class_id: log.class_id.clone(),
            teacher_id: log.teacher_id.clone(),
            concept_id: log.concept_id.clone(),
            timestamp: log.timestamp.timestamp_millis(),
            participation_rate: log.participation_rate,
            engagement_level: log.engagement_level.as_str().to_string(),
            active_students: log.active_students,
            total_students: log.total_students,
            average_response_time: log.average_response_time,
            correct_response_rate: log.correct_response_rate,
        }
    }
}

impl TryFrom<EngagementLogRow> for EngagementLog {
    type Error = Error;

    fn try_from(row: EngagementLogRow) -> Result<Self> {
        Ok(Self {
            timestamp: from_millis(row.timestamp)?,
            engagement_level: row.engagement_level.parse()?,
            session_id: row.session_id,
            class_id: row.class_id,
            teacher_id: row.teacher_id,
            concept_id: row.concept_id,
            participation_rate: row.participation_rate,
            active_students: row.active_students,
            total_students: row.total_students,
            average_response_time: row.average_response_time,
            correct_response_rate: row.correct_response_rate,
        })
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct MasteryScoreRow {
    pub student_id: String,
    pub concept_id: String,
    pub accuracy: u8,
    pub consistency: u8,
    pub speed: u8,
    pub overall_score: u8,
    pub attempts: u32,
    pub last_attempt_at: i64,
    /// JSON array of history entries
    pub history: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<&MasteryScore> for MasteryScoreRow {
    type Error = Error;

    fn try_from(score: &MasteryScore) -> Result<Self> {
        Ok(Self {
            student_id: score.student_id.clone(),
            concept_id: score.concept_id.clone(),
            accuracy: score.accuracy,
            consistency: score.consistency,
            speed: score.speed,
            overall_score: score.overall_score,
            attempts: score.attempts,
            last_attempt_at: score.last_attempt_at.timestamp_millis(),
            history: serde_json::to_string(&score.history)?,
            created_at: score.created_at.timestamp_millis(),
            updated_at: score.updated_at.timestamp_millis(),
        })
    }
}

impl TryFrom<MasteryScoreRow> for MasteryScore {
    type Error = Error;

    fn try_from(row: MasteryScoreRow) -> Result<Self> {
        let history: Vec<MasteryHistoryEntry> = serde_json::from_str(&row.history)?;
        Ok(Self {
            last_attempt_at: from_millis(row.last_attempt_at)?,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
            student_id: row.student_id,
            concept_id: row.concept_id,
            accuracy: row.accuracy,
            consistency: row.consistency,
            speed: row.speed,
            overall_score: row.overall_score,
            attempts: row.attempts,
            history,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::internal(format!("timestamp out of range: {millis}")))
}
