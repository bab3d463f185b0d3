//! Session engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use classroom_core::limits::{
    DEFAULT_TIME_LIMIT_SECS, MASTERY_EXPECTED_TIME_SECS, MIN_STUDENTS_FOR_ENGAGEMENT,
    SESSION_IDLE_TIMEOUT_MINUTES, SESSION_MAX_DURATION_MINUTES,
};
use classroom_core::MasteryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Auto-close delay when a push carries no time limit (seconds)
    #[serde(default = "default_time_limit_secs")]
    pub default_time_limit_secs: u32,
    /// Send the correct answer of pushed questions to students too
    #[serde(default)]
    pub reveal_answer_to_students: bool,
    /// Buffered events per session topic before slow receivers lag
    #[serde(default = "default_topic_capacity")]
    pub topic_capacity: usize,
    /// Retries for a failed learning store call
    #[serde(default = "default_store_retries")]
    pub store_retries: u32,
    /// Linear backoff step between retries (milliseconds)
    #[serde(default = "default_store_retry_backoff_ms")]
    pub store_retry_backoff_ms: u64,
    /// Keep at most this many mastery history entries; unbounded when unset
    #[serde(default)]
    pub mastery_history_limit: Option<usize>,
    #[serde(default = "default_mastery_expected_time_secs")]
    pub mastery_expected_time_secs: f64,
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: i64,
    #[serde(default = "default_idle_timeout_minutes")]
    pub idle_timeout_minutes: i64,
    /// Sessions smaller than this never raise low-engagement alerts
    #[serde(default = "default_min_students_for_alerts")]
    pub min_students_for_alerts: usize,
}

fn default_time_limit_secs() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_topic_capacity() -> usize {
    256
}

fn default_store_retries() -> u32 {
    2
}

fn default_store_retry_backoff_ms() -> u64 {
    100
}

fn default_mastery_expected_time_secs() -> f64 {
    MASTERY_EXPECTED_TIME_SECS
}

fn default_max_duration_minutes() -> i64 {
    SESSION_MAX_DURATION_MINUTES
}

fn default_idle_timeout_minutes() -> i64 {
    SESSION_IDLE_TIMEOUT_MINUTES
}

fn default_min_students_for_alerts() -> usize {
    MIN_STUDENTS_FOR_ENGAGEMENT
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_time_limit_secs: default_time_limit_secs(),
            reveal_answer_to_students: false,
            topic_capacity: default_topic_capacity(),
            store_retries: default_store_retries(),
            store_retry_backoff_ms: default_store_retry_backoff_ms(),
            mastery_history_limit: None,
            mastery_expected_time_secs: default_mastery_expected_time_secs(),
            max_duration_minutes: default_max_duration_minutes(),
            idle_timeout_minutes: default_idle_timeout_minutes(),
            min_students_for_alerts: default_min_students_for_alerts(),
        }
    }
}

impl SessionConfig {
    pub fn mastery_policy(&self) -> MasteryPolicy {
        MasteryPolicy {
            expected_time_secs: self.mastery_expected_time_secs,
            history_limit: self.mastery_history_limit,
        }
    }

    pub fn store_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.store_retry_backoff_ms)
    }

    pub fn max_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_duration_minutes)
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_timeout_minutes)
    }
}
