//! Learning store backed by ClickHouse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use classroom_core::error::StoreErrorCode;
use classroom_core::{EngagementLog, Error, LearningStore, MasteryScore, Result};

use crate::client::ClickHouseClient;
use crate::health::check_connection;
use crate::rows::{EngagementLogRow, MasteryScoreRow};
use crate::{insert, query};

#[derive(Clone)]
pub struct ClickHouseLearningStore {
    client: ClickHouseClient,
}

impl ClickHouseLearningStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

fn into_scores(rows: Vec<MasteryScoreRow>) -> Result<Vec<MasteryScore>> {
    rows.into_iter().map(MasteryScore::try_from).collect()
}

#[async_trait]
impl LearningStore for ClickHouseLearningStore {
    async fn mastery_score(
        &self,
        student_id: &str,
        concept_id: &str,
    ) -> Result<Option<MasteryScore>> {
        query::fetch_mastery_score(&self.client, student_id, concept_id)
            .await?
            .map(MasteryScore::try_from)
            .transpose()
    }

    async fn put_mastery_score(&self, score: &MasteryScore) -> Result<()> {
        let row = MasteryScoreRow::try_from(score)?;
        insert::insert_mastery_scores(&self.client, &[row]).await?;
        Ok(())
    }

    async fn student_mastery(&self, student_id: &str) -> Result<Vec<MasteryScore>> {
        into_scores(query::fetch_student_mastery(&self.client, student_id).await?)
    }

    async fn concept_mastery(
        &self,
        concept_id: &str,
        student_ids: &[String],
    ) -> Result<Vec<MasteryScore>> {
        into_scores(query::fetch_concept_mastery(&self.client, concept_id, student_ids).await?)
    }

    async fn append_engagement_log(&self, log: &EngagementLog) -> Result<()> {
        insert::insert_engagement_logs(&self.client, &[EngagementLogRow::from(log)]).await?;
        Ok(())
    }

    async fn engagement_logs(
        &self,
        class_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EngagementLog>> {
        query::fetch_engagement_logs(&self.client, class_id, from, to)
            .await?
            .into_iter()
            .map(EngagementLog::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        if check_connection(&self.client).await {
            Ok(())
        } else {
            Err(Error::store(
                StoreErrorCode::ReadFailed,
                "ClickHouse unreachable",
            ))
        }
    }
}
