//! Mock implementations for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use classroom_core::error::StoreErrorCode;
use classroom_core::{EngagementLog, Error, LearningStore, MasteryScore, Result};
use session_engine::InMemoryStore;

/// Learning store that fails writes on demand.
///
/// Delegates to an [`InMemoryStore`] so tests can inspect what was actually
/// persisted. `fail_next_writes(n)` makes the next `n` writes fail with a
/// transient `STORE_002`; `set_failing(true)` fails every write.
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<InMemoryStore>,
    failures_left: Arc<AtomicU32>,
    always_fail: Arc<AtomicBool>,
    write_attempts: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failures_left: Arc::new(AtomicU32::new(0)),
            always_fail: Arc::new(AtomicBool::new(false)),
            write_attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn fail_next_writes(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.always_fail.store(failing, Ordering::SeqCst);
    }

    /// Writes attempted so far, including failed ones.
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &Arc<InMemoryStore> {
        &self.inner
    }

    fn check_write(&self) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        if self.always_fail.load(Ordering::SeqCst) {
            return Err(Error::store(StoreErrorCode::WriteFailed, "injected failure"));
        }

        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(Error::store(StoreErrorCode::WriteFailed, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl LearningStore for FlakyStore {
    async fn mastery_score(
        &self,
        student_id: &str,
        concept_id: &str,
    ) -> Result<Option<MasteryScore>> {
        self.inner.mastery_score(student_id, concept_id).await
    }

    async fn put_mastery_score(&self, score: &MasteryScore) -> Result<()> {
        self.check_write()?;
        self.inner.put_mastery_score(score).await
    }

    async fn student_mastery(&self, student_id: &str) -> Result<Vec<MasteryScore>> {
        self.inner.student_mastery(student_id).await
    }

    async fn concept_mastery(
        &self,
        concept_id: &str,
        student_ids: &[String],
    ) -> Result<Vec<MasteryScore>> {
        self.inner.concept_mastery(concept_id, student_ids).await
    }

    async fn append_engagement_log(&self, log: &EngagementLog) -> Result<()> {
        self.check_write()?;
        self.inner.append_engagement_log(log).await
    }

    async fn engagement_logs(
        &self,
        class_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EngagementLog>> {
        self.inner.engagement_logs(class_id, from, to).await
    }
}
