//! Collaborator interfaces consumed by the session engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engagement::EngagementLog;
use crate::error::Result;
use crate::mastery::MasteryScore;
use crate::question::Question;

/// Read-only access to authored question content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn question_by_id(&self, question_id: &str) -> Result<Option<Question>>;
}

/// Persistence of mastery records and engagement logs.
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn mastery_score(&self, student_id: &str, concept_id: &str)
        -> Result<Option<MasteryScore>>;

    /// Inserts or replaces the record for `(student_id, concept_id)`.
    async fn put_mastery_score(&self, score: &MasteryScore) -> Result<()>;

    /// All records of one student.
    async fn student_mastery(&self, student_id: &str) -> Result<Vec<MasteryScore>>;

    /// Records of `concept_id` for the given students; students without a
    /// record are left out.
    async fn concept_mastery(&self, concept_id: &str, student_ids: &[String])
        -> Result<Vec<MasteryScore>>;

    async fn append_engagement_log(&self, log: &EngagementLog) -> Result<()>;

    /// Logs of a class within `[from, to]`, oldest first.
    async fn engagement_logs(
        &self,
        class_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EngagementLog>>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
