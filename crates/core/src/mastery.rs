//! Mastery model.
//!
//! A student's command of one concept is scored from the full answer history:
//! `overall = accuracy(50%) + consistency(30%) + speed(20%)`.
//! Every new attempt is appended and all numbers are recomputed from scratch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::limits::{
    MASTERY_EXPECTED_TIME_SECS, MASTERY_MIN_CONSISTENCY_ATTEMPTS, MASTERY_NEUTRAL_CONSISTENCY,
    MASTERY_RECENT_WINDOW,
};

pub const ACCURACY_WEIGHT: f64 = 0.5;
pub const CONSISTENCY_WEIGHT: f64 = 0.3;
pub const SPEED_WEIGHT: f64 = 0.2;

/// Scores up to and including this value are weak.
pub const WEAK_THRESHOLD: u8 = 40;
/// Scores up to and including this value (and above weak) are medium.
pub const MEDIUM_THRESHOLD: u8 = 70;

/// Mastery bucket used by dashboards and homework assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    Weak,
    Medium,
    Strong,
}

impl MasteryLevel {
    pub fn from_score(score: u8) -> Self {
        if score <= WEAK_THRESHOLD {
            Self::Weak
        } else if score <= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Strong
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryHistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Overall score right after this attempt was recorded
    pub score: u8,
    pub question_id: String,
    pub is_correct: bool,
    /// Seconds
    pub time_taken: f64,
}

/// An attempt to be recorded.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub question_id: String,
    pub is_correct: bool,
    pub time_taken: f64,
}

/// Tunables for recording attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryPolicy {
    pub expected_time_secs: f64,
    /// Keep at most this many history entries (oldest dropped first).
    /// Accuracy then covers the retained window only.
    pub history_limit: Option<usize>,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            expected_time_secs: MASTERY_EXPECTED_TIME_SECS,
            history_limit: None,
        }
    }
}

/// Persistent mastery record for a (student, concept) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryScore {
    pub student_id: String,
    pub concept_id: String,
    pub accuracy: u8,
    pub consistency: u8,
    pub speed: u8,
    pub overall_score: u8,
    pub attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
    pub history: Vec<MasteryHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MasteryScore {
    /// Creates an empty record; scores match an empty history.
    pub fn new(student_id: impl Into<String>, concept_id: impl Into<String>) -> Self {
        let now = Utc::now();
        let consistency = consistency(&[]);
        Self {
            student_id: student_id.into(),
            concept_id: concept_id.into(),
            accuracy: 0,
            consistency,
            speed: 0,
            overall_score: overall_score(0, consistency, 0),
            attempts: 0,
            last_attempt_at: now,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends an attempt and recomputes every score from the history.
    pub fn record(&mut self, attempt: Attempt, now: DateTime<Utc>, policy: &MasteryPolicy) {
        self.history.push(MasteryHistoryEntry {
            timestamp: now,
            score: 0,
            question_id: attempt.question_id,
            is_correct: attempt.is_correct,
            time_taken: attempt.time_taken,
        });

        if let Some(limit) = policy.history_limit.filter(|l| *l > 0) {
            let excess = self.history.len().saturating_sub(limit);
            self.history.drain(..excess);
        }

        self.accuracy = accuracy(&self.history);
        self.consistency = consistency(&self.history);
        self.speed = speed(&self.history, policy.expected_time_secs);
        self.overall_score = overall_score(self.accuracy, self.consistency, self.speed);

        if let Some(last) = self.history.last_mut() {
            last.score = self.overall_score;
        }

        self.attempts = self.history.len() as u32;
        self.last_attempt_at = now;
        self.updated_at = now;
    }

    pub fn level(&self) -> MasteryLevel {
        MasteryLevel::from_score(self.overall_score)
    }
}

fn recent(history: &[MasteryHistoryEntry]) -> &[MasteryHistoryEntry] {
    &history[history.len().saturating_sub(MASTERY_RECENT_WINDOW)..]
}

/// Percentage of correct attempts over the whole history.
pub fn accuracy(history: &[MasteryHistoryEntry]) -> u8 {
    if history.is_empty() {
        return 0;
    }

    let correct = history.iter().filter(|h| h.is_correct).count();
    (correct as f64 / history.len() as f64 * 100.0).round() as u8
}

/// Stability of recent performance: low variance and long correct streaks.
pub fn consistency(history: &[MasteryHistoryEntry]) -> u8 {
    if history.len() < MASTERY_MIN_CONSISTENCY_ATTEMPTS {
        return MASTERY_NEUTRAL_CONSISTENCY;
    }

    let window = recent(history);
    let n = window.len() as f64;

    let mut streak = 0usize;
    let mut max_streak = 0usize;
    for entry in window {
        if entry.is_correct {
            streak += 1;
            max_streak = max_streak.max(streak);
        } else {
            streak = 0;
        }
    }

    let values: Vec<f64> = window
        .iter()
        .map(|h| if h.is_correct { 1.0 } else { 0.0 })
        .collect();
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let variance_score = (100.0 - variance * 100.0).max(0.0);
    let streak_bonus = max_streak as f64 / n * 50.0;

    (variance_score * 0.6 + streak_bonus).round().min(100.0) as u8
}

/// Recent answering speed against an expected time per question.
pub fn speed(history: &[MasteryHistoryEntry], expected_time: f64) -> u8 {
    if history.is_empty() {
        return 0;
    }

    let window = recent(history);
    let mean = window.iter().map(|h| h.time_taken).sum::<f64>() / window.len() as f64;

    if mean <= expected_time * 0.5 {
        return 100;
    }
    if mean >= expected_time * 2.0 {
        return 0;
    }

    let ratio = (expected_time * 2.0 - mean) / (expected_time * 1.5);
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn overall_score(accuracy: u8, consistency: u8, speed: u8) -> u8 {
    (accuracy as f64 * ACCURACY_WEIGHT
        + consistency as f64 * CONSISTENCY_WEIGHT
        + speed as f64 * SPEED_WEIGHT)
        .round() as u8
}

/// Per-student line of a class mastery summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMastery {
    pub student_id: String,
    pub score: u8,
    pub level: MasteryLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryDistribution {
    pub weak: u32,
    pub medium: u32,
    pub strong: u32,
}

/// Mastery of one concept across a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMastery {
    pub concept_id: String,
    pub average: u8,
    pub distribution: MasteryDistribution,
    pub scores: Vec<StudentMastery>,
}

impl ClassMastery {
    pub fn from_scores(concept_id: impl Into<String>, scores: &[MasteryScore]) -> Self {
        let mut distribution = MasteryDistribution::default();
        let mut total = 0u64;

        let scores: Vec<StudentMastery> = scores
            .iter()
            .map(|s| {
                let level = s.level();
                match level {
                    MasteryLevel::Weak => distribution.weak += 1,
                    MasteryLevel::Medium => distribution.medium += 1,
                    MasteryLevel::Strong => distribution.strong += 1,
                }
                total += s.overall_score as u64;
                StudentMastery {
                    student_id: s.student_id.clone(),
                    score: s.overall_score,
                    level,
                }
            })
            .collect();

        let average = if scores.is_empty() {
            0
        } else {
            (total as f64 / scores.len() as f64).round() as u8
        };

        Self {
            concept_id: concept_id.into(),
            average,
            distribution,
            scores,
        }
    }
}
