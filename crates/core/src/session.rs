//! Live session state.
//!
//! A [`Session`] is ephemeral: it lives from the first teacher join until it
//! is ended and is never persisted. It holds at most one active question.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::{
    engagement_score, percentage, update_engagement_state, EngagementLevel, EngagementLog,
    EngagementState,
};
use crate::limits::ENGAGEMENT_EXPECTED_RESPONSE_SECS;
use crate::question::{AnswerValue, Question};

/// Connection role within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

/// A student's latest answer to the active question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub answer: AnswerValue,
    pub time_taken: f64,
    pub is_correct: bool,
    pub submitted_at: DateTime<Utc>,
}

/// The question currently collecting answers.
#[derive(Debug, Clone)]
pub struct ActiveQuestion {
    pub question: Question,
    pub pushed_at: DateTime<Utc>,
    /// Seconds until auto-close
    pub time_limit: u32,
    pub answers: HashMap<String, RecordedAnswer>,
}

/// Answer tally of a question.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub total_responses: usize,
    pub correct_responses: usize,
    pub average_time: f64,
}

impl ActiveQuestion {
    pub fn new(question: Question, time_limit: u32, pushed_at: DateTime<Utc>) -> Self {
        Self {
            question,
            pushed_at,
            time_limit,
            answers: HashMap::new(),
        }
    }

    pub fn question_id(&self) -> &str {
        &self.question.id
    }

    pub fn tally(&self) -> Tally {
        let total_responses = self.answers.len();
        if total_responses == 0 {
            return Tally::default();
        }

        let correct_responses = self.answers.values().filter(|a| a.is_correct).count();
        let total_time: f64 = self.answers.values().map(|a| a.time_taken).sum();

        Tally {
            total_responses,
            correct_responses,
            average_time: total_time / total_responses as f64,
        }
    }

    /// Aggregates the answers for `question:results`.
    pub fn results(&self) -> QuestionResults {
        let tally = self.tally();

        let mut option_distribution = BTreeMap::new();
        for recorded in self.answers.values() {
            *option_distribution
                .entry(recorded.answer.distribution_key())
                .or_insert(0u32) += 1;
        }

        QuestionResults {
            question_id: self.question.id.clone(),
            total_responses: tally.total_responses as u32,
            correct_responses: tally.correct_responses as u32,
            option_distribution,
            average_time: tally.average_time.round() as u32,
        }
    }
}

/// Aggregated outcome of a closed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResults {
    pub question_id: String,
    pub total_responses: u32,
    pub correct_responses: u32,
    pub option_distribution: BTreeMap<String, u32>,
    /// Rounded mean of `timeTaken`, 0 when nobody answered
    pub average_time: u32,
}

/// What closing a question produced.
#[derive(Debug, Clone)]
pub struct ClosedQuestion {
    pub results: QuestionResults,
    pub log: EngagementLog,
}

/// Per-question figures kept for the end-of-session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedQuestionStats {
    pub question_id: String,
    pub participation_rate: f64,
    pub engagement_score: u8,
    pub closed_at: DateTime<Utc>,
}

impl ClosedQuestionStats {
    pub fn level(&self) -> EngagementLevel {
        EngagementLevel::from_score(self.engagement_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub questions_asked: u32,
    pub average_engagement: u8,
    pub participation_rate: f64,
}

/// Read-only view of a session for the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub class_id: String,
    pub teacher_id: String,
    pub concept_id: String,
    pub students: Vec<String>,
    pub active_question_id: Option<String>,
    pub answers_received: u32,
    pub engagement_level: Option<EngagementLevel>,
    /// Most recently closed question
    pub last_question: Option<ClosedQuestionStats>,
    pub questions_asked: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// A live classroom session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub class_id: String,
    pub teacher_id: String,
    /// Concept of the most recently pushed question
    pub concept_id: String,
    pub students: BTreeSet<String>,
    pub active_question: Option<ActiveQuestion>,
    pub engagement: Option<EngagementState>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub questions_asked: u32,
    pub closed: Vec<ClosedQuestionStats>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        teacher_id: impl Into<String>,
        class_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            teacher_id: teacher_id.into(),
            concept_id: String::new(),
            students: BTreeSet::new(),
            active_question: None,
            engagement: None,
            started_at: now,
            last_activity_at: now,
            questions_asked: 0,
            closed: Vec::new(),
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Returns false if the student was already joined.
    pub fn add_student(&mut self, student_id: &str) -> bool {
        self.students.insert(student_id.to_string())
    }

    /// Returns false if the student was not joined.
    pub fn remove_student(&mut self, student_id: &str) -> bool {
        self.students.remove(student_id)
    }

    /// Makes `question` the active one. A previously active question is
    /// returned unscored.
    pub fn start_question(
        &mut self,
        question: Question,
        time_limit: u32,
        now: DateTime<Utc>,
    ) -> Option<ActiveQuestion> {
        self.concept_id = question.concept_id.clone();
        self.questions_asked += 1;
        self.last_activity_at = now;
        self.active_question
            .replace(ActiveQuestion::new(question, time_limit, now))
    }

    pub fn is_active(&self, question_id: &str) -> bool {
        self.active_question
            .as_ref()
            .is_some_and(|q| q.question_id() == question_id)
    }

    /// Records an answer to the active question, replacing the student's
    /// previous one. Returns `None` when `question_id` is not active.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        student_id: &str,
        answer: AnswerValue,
        time_taken: f64,
        now: DateTime<Utc>,
    ) -> Option<RecordedAnswer> {
        let active = self
            .active_question
            .as_mut()
            .filter(|q| q.question_id() == question_id)?;

        let recorded = RecordedAnswer {
            is_correct: active.question.is_correct(&answer),
            answer,
            time_taken,
            submitted_at: now,
        };
        active
            .answers
            .insert(student_id.to_string(), recorded.clone());
        self.last_activity_at = now;
        Some(recorded)
    }

    /// Recomputes and stores the live engagement state from the joined
    /// students and the active question's answers (zeros when idle).
    pub fn recompute_engagement(&mut self) -> EngagementState {
        let tally = self
            .active_question
            .as_ref()
            .map(ActiveQuestion::tally)
            .unwrap_or_default();

        let state = update_engagement_state(
            &self.id,
            &self.class_id,
            self.students.iter().cloned().collect(),
            self.students.len(),
            tally.correct_responses,
            tally.total_responses,
            tally.average_time,
        );
        self.engagement = Some(state.clone());
        state
    }

    /// Closes `question_id` if it is still the active question.
    pub fn close_question(&mut self, question_id: &str, now: DateTime<Utc>) -> Option<ClosedQuestion> {
        if !self.is_active(question_id) {
            return None;
        }
        let active = self.active_question.take()?;

        let results = active.results();
        let tally = active.tally();
        let participation_rate = percentage(tally.total_responses, self.students.len());
        let correct_response_rate = percentage(tally.correct_responses, tally.total_responses);
        let score = engagement_score(
            participation_rate,
            correct_response_rate,
            tally.average_time,
            ENGAGEMENT_EXPECTED_RESPONSE_SECS,
        );

        let log = EngagementLog {
            session_id: self.id.clone(),
            class_id: self.class_id.clone(),
            teacher_id: self.teacher_id.clone(),
            concept_id: self.concept_id.clone(),
            timestamp: now,
            participation_rate,
            engagement_level: EngagementLevel::from_score(score),
            active_students: tally.total_responses as u32,
            total_students: self.students.len() as u32,
            average_response_time: tally.average_time,
            correct_response_rate,
        };

        self.closed.push(ClosedQuestionStats {
            question_id: question_id.to_string(),
            participation_rate,
            engagement_score: score,
            closed_at: now,
        });
        self.last_activity_at = now;

        Some(ClosedQuestion { results, log })
    }

    pub fn summary(&self) -> SessionSummary {
        let closed = self.closed.len();
        let (engagement, participation) = self
            .closed
            .iter()
            .fold((0.0, 0.0), |(e, p), stats| {
                (e + stats.engagement_score as f64, p + stats.participation_rate)
            });

        let (average_engagement, participation_rate) = if closed == 0 {
            (0, 0.0)
        } else {
            (
                (engagement / closed as f64).round() as u8,
                (participation / closed as f64 * 100.0).round() / 100.0,
            )
        };

        SessionSummary {
            questions_asked: self.questions_asked,
            average_engagement,
            participation_rate,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            class_id: self.class_id.clone(),
            teacher_id: self.teacher_id.clone(),
            concept_id: self.concept_id.clone(),
            students: self.students.iter().cloned().collect(),
            active_question_id: self
                .active_question
                .as_ref()
                .map(|q| q.question_id().to_string()),
            answers_received: self
                .active_question
                .as_ref()
                .map(|q| q.answers.len() as u32)
                .unwrap_or(0),
            engagement_level: self.engagement.as_ref().map(|e| e.current_level),
            last_question: self.closed.last().cloned(),
            questions_asked: self.questions_asked,
            started_at: self.started_at,
            last_activity_at: self.last_activity_at,
        }
    }

    /// Whether the session ran past `max_duration` or sat idle past `idle_timeout`.
    pub fn is_expired(&self, now: DateTime<Utc>, max_duration: Duration, idle_timeout: Duration) -> bool {
        now - self.started_at > max_duration || now - self.last_activity_at > idle_timeout
    }
}
