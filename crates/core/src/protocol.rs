//! Realtime wire protocol.
//!
//! Every frame is `{"event": "<name>", "data": {...}}` with camelCase fields.
//! Inbound payloads are validated at the transport boundary before they reach
//! the session controller.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::engagement::EngagementState;
use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{MAX_ANSWER_LEN, MAX_ANSWER_OPTIONS, MAX_ID_LEN};
use crate::question::{AnswerValue, QuestionView};
use crate::session::{QuestionResults, Role, SessionSummary};

const ID_PATTERN: &str = r"^[A-Za-z0-9_.:\-]+$";

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ID_PATTERN).expect("invalid id pattern"));

fn validate_id(id: &str) -> std::result::Result<(), ValidationError> {
    if ID_REGEX.is_match(id) {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_id");
    err.message = Some("ids may only contain letters, digits, '_', '-', '.', ':'".into());
    Err(err)
}

/// Checks an id taken from outside a frame, such as a URL path segment.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && ID_REGEX.is_match(id)
}

fn validate_answer(answer: &AnswerValue) -> std::result::Result<(), ValidationError> {
    let count = answer.values().count();
    if count == 0 || count > MAX_ANSWER_OPTIONS {
        let mut err = ValidationError::new("answer_option_count");
        err.message = Some(format!("answer must carry 1 to {MAX_ANSWER_OPTIONS} options").into());
        return Err(err);
    }
    if answer
        .values()
        .any(|v| v.is_empty() || v.len() > MAX_ANSWER_LEN)
    {
        let mut err = ValidationError::new("answer_value_length");
        err.message = Some(format!("answer values must be 1 to {MAX_ANSWER_LEN} chars").into());
        return Err(err);
    }
    Ok(())
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub user_id: String,
    pub role: Role,
    /// Only used when a teacher join creates the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSession {
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PushQuestion {
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub question_id: String,
    /// Seconds; defaults to the configured limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 3600))]
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub question_id: String,
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub student_id: String,
    #[validate(custom(function = "validate_answer"))]
    pub answer: AnswerValue,
    /// Seconds
    #[validate(range(min = 0.0, max = 86400.0))]
    pub time_taken: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestEngagement {
    #[validate(length(min = 1, max = 128), custom(function = "validate_id"))]
    pub session_id: String,
    #[serde(default)]
    #[validate(length(max = 128))]
    pub class_id: String,
}

/// Frames accepted from clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "session:join")]
    Join(JoinSession),
    #[serde(rename = "session:leave")]
    Leave(LeaveSession),
    #[serde(rename = "question:push")]
    PushQuestion(PushQuestion),
    #[serde(rename = "question:answer")]
    Answer(SubmitAnswer),
    #[serde(rename = "teacher:request-engagement")]
    RequestEngagement(RequestEngagement),
}

impl ClientMessage {
    /// Parses and validates a text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let message: Self = serde_json::from_str(text).map_err(|e| {
            Error::validation_code(ValidationErrorCode::InvalidFormat, e.to_string())
        })?;
        message.validate()?;
        Ok(message)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Join(p) => p.validate()?,
            Self::Leave(p) => p.validate()?,
            Self::PushQuestion(p) => p.validate()?,
            Self::Answer(p) => p.validate()?,
            Self::RequestEngagement(p) => p.validate()?,
        }
        Ok(())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Join(_) => "session:join",
            Self::Leave(_) => "session:leave",
            Self::PushQuestion(_) => "question:push",
            Self::Answer(_) => "question:answer",
            Self::RequestEngagement(_) => "teacher:request-engagement",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::Join(p) => &p.session_id,
            Self::Leave(p) => &p.session_id,
            Self::PushQuestion(p) => &p.session_id,
            Self::Answer(p) => &p.session_id,
            Self::RequestEngagement(p) => &p.session_id,
        }
    }
}

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPushed {
    pub session_id: String,
    pub question: QuestionView,
    pub pushed_at: DateTime<Utc>,
    pub time_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryUpdate {
    pub student_id: String,
    pub concept_id: String,
    pub new_score: u8,
    /// 0 on a student's first attempt at the concept
    pub previous_score: u8,
    pub change: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub session_id: String,
    pub class_id: String,
    pub teacher_id: String,
    pub concept_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    pub session_id: String,
    pub ended_at: DateTime<Utc>,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&Error> for ErrorFrame {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            code: err.error_code().map(str::to_string),
        }
    }
}

/// Frames sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "engagement:update")]
    EngagementUpdate(EngagementState),
    #[serde(rename = "question:pushed")]
    QuestionPushed(QuestionPushed),
    #[serde(rename = "question:results")]
    QuestionResults(QuestionResults),
    #[serde(rename = "student:mastery-update")]
    MasteryUpdate(MasteryUpdate),
    #[serde(rename = "session:started")]
    SessionStarted(SessionStarted),
    #[serde(rename = "session:ended")]
    SessionEnded(SessionEnded),
    #[serde(rename = "error")]
    Error(ErrorFrame),
}

impl ServerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::EngagementUpdate(_) => "engagement:update",
            Self::QuestionPushed(_) => "question:pushed",
            Self::QuestionResults(_) => "question:results",
            Self::MasteryUpdate(_) => "student:mastery-update",
            Self::SessionStarted(_) => "session:started",
            Self::SessionEnded(_) => "session:ended",
            Self::Error(_) => "error",
        }
    }

    /// Shapes a broadcast for one connection. Students do not get the correct
    /// answer of a pushed question unless `reveal_answer` is set.
    pub fn for_role(&self, role: Role, reveal_answer: bool) -> Self {
        match self {
            Self::QuestionPushed(pushed) if role == Role::Student && !reveal_answer => {
                Self::QuestionPushed(QuestionPushed {
                    question: pushed.question.clone().redacted(),
                    ..pushed.clone()
                })
            }
            other => other.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
