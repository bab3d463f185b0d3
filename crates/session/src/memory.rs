//! In-memory content and learning store.
//!
//! Used for development (seeded from a JSON file of questions) and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use classroom_core::{
    ContentStore, EngagementLog, Error, LearningStore, MasteryScore, Question, Result,
};

#[derive(Default)]
pub struct InMemoryStore {
    questions: RwLock<HashMap<String, Question>>,
    mastery: RwLock<HashMap<(String, String), MasteryScore>>,
    engagement_logs: RwLock<Vec<EngagementLog>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let store = Self::new();
        for question in questions {
            store.insert_question(question);
        }
        store
    }

    /// Loads a JSON array of questions.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::internal(format!("read {}: {e}", path.display())))?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), count = questions.len(), "Seeded question content");
        Ok(Self::with_questions(questions))
    }

    pub fn insert_question(&self, question: Question) {
        self.questions.write().insert(question.id.clone(), question);
    }

    pub fn engagement_log_count(&self) -> usize {
        self.engagement_logs.read().len()
    }

    pub fn all_engagement_logs(&self) -> Vec<EngagementLog> {
        self.engagement_logs.read().clone()
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn question_by_id(&self, question_id: &str) -> Result<Option<Question>> {
        Ok(self.questions.read().get(question_id).cloned())
    }
}

#[async_trait]
impl LearningStore for InMemoryStore {
    async fn mastery_score(
        &self,
        student_id: &str,
        concept_id: &str,
    ) -> Result<Option<MasteryScore>> {
        Ok(self
            .mastery
            .read()
            .get(&(student_id.to_string(), concept_id.to_string()))
            .cloned())
    }

    async fn put_mastery_score(&self, score: &MasteryScore) -> Result<()> {
        self.mastery.write().insert(
            (score.student_id.clone(), score.concept_id.clone()),
            score.clone(),
        );
        Ok(())
    }

    async fn student_mastery(&self, student_id: &str) -> Result<Vec<MasteryScore>> {
        let mut scores: Vec<MasteryScore> = self
            .mastery
            .read()
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        scores.sort_by(|a, b| a.concept_id.cmp(&b.concept_id));
        Ok(scores)
    }

    async fn concept_mastery(
        &self,
        concept_id: &str,
        student_ids: &[String],
    ) -> Result<Vec<MasteryScore>> {
        let mastery = self.mastery.read();
        Ok(student_ids
            .iter()
            .filter_map(|student_id| {
                mastery
                    .get(&(student_id.clone(), concept_id.to_string()))
                    .cloned()
            })
            .collect())
    }

    async fn append_engagement_log(&self, log: &EngagementLog) -> Result<()> {
        self.engagement_logs.write().push(log.clone());
        Ok(())
    }

    async fn engagement_logs(
        &self,
        class_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EngagementLog>> {
        let mut logs: Vec<EngagementLog> = self
            .engagement_logs
            .read()
            .iter()
            .filter(|l| l.class_id == class_id && l.timestamp >= from && l.timestamp <= to)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.timestamp);
        Ok(logs)
    }
}
