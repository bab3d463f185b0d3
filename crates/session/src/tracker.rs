//! Mastery updates.
//!
//! Each answer is a read-modify-write of one `(student, concept)` record.
//! Updates for the same key are serialized with a keyed async lock so that
//! concurrent sessions cannot lose each other's attempts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use classroom_core::{Attempt, LearningStore, MasteryPolicy, MasteryScore, Result};
use telemetry::metrics;

use crate::retry::{with_retry, RetryPolicy};

type Key = (String, String);

/// Result of recording one attempt.
#[derive(Debug, Clone)]
pub struct MasteryOutcome {
    pub score: MasteryScore,
    /// Overall score before the attempt; 0 for a first attempt
    pub previous_score: u8,
}

impl MasteryOutcome {
    pub fn change(&self) -> i16 {
        self.score.overall_score as i16 - self.previous_score as i16
    }
}

pub struct MasteryTracker {
    store: Arc<dyn LearningStore>,
    policy: MasteryPolicy,
    retry: RetryPolicy,
    locks: parking_lot::Mutex<HashMap<Key, Arc<tokio::sync::Mutex<()>>>>,
}

impl MasteryTracker {
    pub fn new(store: Arc<dyn LearningStore>, policy: MasteryPolicy, retry: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            retry,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub async fn record(
        &self,
        student_id: &str,
        concept_id: &str,
        attempt: Attempt,
    ) -> Result<MasteryOutcome> {
        let key = (student_id.to_string(), concept_id.to_string());
        let lock = self
            .locks
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.read_modify_write(student_id, concept_id, attempt).await
        };

        drop(lock);
        self.release(&key);
        result
    }

    async fn read_modify_write(
        &self,
        student_id: &str,
        concept_id: &str,
        attempt: Attempt,
    ) -> Result<MasteryOutcome> {
        let started = Instant::now();

        let existing = with_retry(self.retry, "mastery_score", || {
            self.store.mastery_score(student_id, concept_id)
        })
        .await?;

        let previous_score = existing.as_ref().map(|s| s.overall_score).unwrap_or(0);
        let mut score = existing.unwrap_or_else(|| MasteryScore::new(student_id, concept_id));
        score.record(attempt, Utc::now(), &self.policy);

        with_retry(self.retry, "put_mastery_score", || {
            self.store.put_mastery_score(&score)
        })
        .await?;

        metrics().mastery_updates.inc();
        metrics()
            .mastery_update_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        debug!(
            student_id,
            concept_id,
            previous_score,
            new_score = score.overall_score,
            attempts = score.attempts,
            "Mastery updated"
        );

        Ok(MasteryOutcome {
            score,
            previous_score,
        })
    }

    /// Drops the key's lock once nobody else holds or waits on it.
    fn release(&self, key: &Key) {
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().len()
    }
}
