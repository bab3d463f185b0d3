//! Limits and tuning constants for live sessions.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so payload limits are duplicated there. Keep both in sync when modifying.

// === Question Timing ===

/// Auto-close delay when a push does not carry a time limit.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 60;

/// Longest collection window a teacher may request (1 hour).
pub const MAX_TIME_LIMIT_SECS: u32 = 3600;

/// Largest accepted `timeTaken` for a single answer (1 day).
pub const MAX_TIME_TAKEN_SECS: f64 = 86_400.0;

// === Identifier Limits ===

/// Max length of session, user, question, class and concept ids.
pub const MAX_ID_LEN: usize = 128;

/// Max number of options a multi-select answer may carry.
pub const MAX_ANSWER_OPTIONS: usize = 32;

/// Max length of a single answer value.
pub const MAX_ANSWER_LEN: usize = 256;

// === Mastery Model ===

/// Expected time to answer for the mastery speed component.
pub const MASTERY_EXPECTED_TIME_SECS: f64 = 60.0;

/// Number of most recent attempts used for consistency and speed.
pub const MASTERY_RECENT_WINDOW: usize = 10;

/// Minimum attempts before consistency leaves its neutral value.
pub const MASTERY_MIN_CONSISTENCY_ATTEMPTS: usize = 3;

/// Consistency reported when there is not enough data.
pub const MASTERY_NEUTRAL_CONSISTENCY: u8 = 50;

// === Engagement Model ===

/// Expected class response time for the engagement speed component.
pub const ENGAGEMENT_EXPECTED_RESPONSE_SECS: f64 = 30.0;

/// Trend delta (score points) separating improving/declining from stable.
pub const ENGAGEMENT_TREND_DELTA: f64 = 5.0;

// === Session Housekeeping ===

/// Hard cap on a live session's lifetime.
pub const SESSION_MAX_DURATION_MINUTES: i64 = 60;

/// Sessions without any activity for this long are ended.
pub const SESSION_IDLE_TIMEOUT_MINUTES: i64 = 15;

/// Low-engagement alerts need at least this many joined students.
pub const MIN_STUDENTS_FOR_ENGAGEMENT: usize = 3;
