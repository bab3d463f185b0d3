//! Engagement index.
//!
//! Class readiness during a live session:
//! - `>= 70` green: engaged
//! - `>= 40` yellow: needs attention
//! - below that red: intervention needed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::limits::{ENGAGEMENT_EXPECTED_RESPONSE_SECS, ENGAGEMENT_TREND_DELTA};

pub const PARTICIPATION_WEIGHT: f64 = 0.4;
pub const CORRECT_RESPONSES_WEIGHT: f64 = 0.35;
pub const RESPONSE_TIME_WEIGHT: f64 = 0.25;

pub const GREEN_THRESHOLD: u8 = 70;
pub const YELLOW_THRESHOLD: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    Green,
    Yellow,
    Red,
}

impl EngagementLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= GREEN_THRESHOLD {
            Self::Green
        } else if score >= YELLOW_THRESHOLD {
            Self::Yellow
        } else {
            Self::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl std::str::FromStr for EngagementLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            other => Err(crate::Error::validation(format!(
                "unknown engagement level: {other}"
            ))),
        }
    }
}

/// `part / whole` as a percentage; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Faster than twice the expected time scores higher, clamped to 0..=100.
pub fn response_time_score(average_response_time: f64, expected_response_time: f64) -> f64 {
    if expected_response_time <= 0.0 {
        return 0.0;
    }
    ((expected_response_time * 2.0 - average_response_time) / expected_response_time * 100.0)
        .round()
        .clamp(0.0, 100.0)
}

pub fn engagement_score(
    participation_rate: f64,
    correct_response_rate: f64,
    average_response_time: f64,
    expected_response_time: f64,
) -> u8 {
    let response_time = response_time_score(average_response_time, expected_response_time);

    (participation_rate * PARTICIPATION_WEIGHT
        + correct_response_rate * CORRECT_RESPONSES_WEIGHT
        + response_time * RESPONSE_TIME_WEIGHT)
        .round()
        .clamp(0.0, 100.0) as u8
}

/// Live engagement of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementState {
    pub session_id: String,
    pub class_id: String,
    pub current_level: EngagementLevel,
    pub participation_rate: f64,
    pub active_students: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// Computes a fresh engagement state. The caller stores it against the session.
pub fn update_engagement_state(
    session_id: &str,
    class_id: &str,
    active_students: Vec<String>,
    total_students: usize,
    correct_responses: usize,
    total_responses: usize,
    average_response_time: f64,
) -> EngagementState {
    let participation_rate = percentage(active_students.len(), total_students);
    let correct_response_rate = percentage(correct_responses, total_responses);

    let score = engagement_score(
        participation_rate,
        correct_response_rate,
        average_response_time,
        ENGAGEMENT_EXPECTED_RESPONSE_SECS,
    );

    EngagementState {
        session_id: session_id.to_string(),
        class_id: class_id.to_string(),
        current_level: EngagementLevel::from_score(score),
        participation_rate,
        active_students,
        last_updated: Utc::now(),
    }
}

/// Engagement snapshot persisted when a question closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementLog {
    pub session_id: String,
    pub class_id: String,
    pub teacher_id: String,
    pub concept_id: String,
    pub timestamp: DateTime<Utc>,
    pub participation_rate: f64,
    pub engagement_level: EngagementLevel,
    /// Students who answered
    pub active_students: u32,
    pub total_students: u32,
    pub average_response_time: f64,
    pub correct_response_rate: f64,
}

impl EngagementLog {
    pub fn score(&self) -> u8 {
        engagement_score(
            self.participation_rate,
            self.correct_response_rate,
            self.average_response_time,
            ENGAGEMENT_EXPECTED_RESPONSE_SECS,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: DateTime<Utc>,
    pub level: EngagementLevel,
    pub score: u8,
}

/// Engagement of a class over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementTrends {
    pub average_engagement: u8,
    pub session_count: usize,
    pub trend: Trend,
    pub timeline: Vec<TimelinePoint>,
}

/// Scores each log and compares the first half of the period with the second.
pub fn engagement_trends(logs: &[EngagementLog]) -> EngagementTrends {
    let mut ordered: Vec<&EngagementLog> = logs.iter().collect();
    ordered.sort_by_key(|l| l.timestamp);

    let timeline: Vec<TimelinePoint> = ordered
        .iter()
        .map(|log| TimelinePoint {
            date: log.timestamp,
            level: log.engagement_level,
            score: log.score(),
        })
        .collect();

    if timeline.is_empty() {
        return EngagementTrends {
            average_engagement: 0,
            session_count: 0,
            trend: Trend::Stable,
            timeline,
        };
    }

    let mean = |points: &[TimelinePoint]| {
        if points.is_empty() {
            0.0
        } else {
            points.iter().map(|p| p.score as f64).sum::<f64>() / points.len() as f64
        }
    };

    let midpoint = timeline.len() / 2;
    let first_half = mean(&timeline[..midpoint]);
    let second_half = mean(&timeline[midpoint..]);

    let trend = if second_half - first_half > ENGAGEMENT_TREND_DELTA {
        Trend::Improving
    } else if first_half - second_half > ENGAGEMENT_TREND_DELTA {
        Trend::Declining
    } else {
        Trend::Stable
    };

    EngagementTrends {
        average_engagement: mean(&timeline).round() as u8,
        session_count: timeline.len(),
        trend,
        timeline,
    }
}
