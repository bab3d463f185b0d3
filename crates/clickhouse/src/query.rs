//! Read queries.
//!
//! Mastery reads use `FINAL` so replaced versions never surface before a
//! background merge collapses them.

use chrono::{DateTime, Utc};
use classroom_core::error::StoreErrorCode;
use classroom_core::{Error, Result};

use crate::client::ClickHouseClient;
use crate::rows::{EngagementLogRow, MasteryScoreRow};
use crate::schema::{ENGAGEMENT_LOGS_TABLE, MASTERY_SCORES_TABLE};

fn read_error(e: clickhouse::error::Error) -> Error {
    Error::store(StoreErrorCode::ReadFailed, format!("Query error: {e}"))
}

pub async fn fetch_mastery_score(
    client: &ClickHouseClient,
    student_id: &str,
    concept_id: &str,
) -> Result<Option<MasteryScoreRow>> {
    let sql = format!(
        "SELECT ?fields FROM {} FINAL WHERE student_id = ? AND concept_id = ? LIMIT 1",
        client.table(MASTERY_SCORES_TABLE)
    );
    client
        .inner()
        .query(&sql)
        .bind(student_id)
        .bind(concept_id)
        .fetch_optional::<MasteryScoreRow>()
        .await
        .map_err(read_error)
}

pub async fn fetch_student_mastery(
    client: &ClickHouseClient,
    student_id: &str,
) -> Result<Vec<MasteryScoreRow>> {
    let sql = format!(
        "SELECT ?fields FROM {} FINAL WHERE student_id = ? ORDER BY concept_id",
        client.table(MASTERY_SCORES_TABLE)
    );
    client
        .inner()
        .query(&sql)
        .bind(student_id)
        .fetch_all::<MasteryScoreRow>()
        .await
        .map_err(read_error)
}

pub async fn fetch_concept_mastery(
    client: &ClickHouseClient,
    concept_id: &str,
    student_ids: &[String],
) -> Result<Vec<MasteryScoreRow>> {
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT ?fields FROM {} FINAL WHERE concept_id = ? AND student_id IN ? ORDER BY student_id",
        client.table(MASTERY_SCORES_TABLE)
    );
    client
        .inner()
        .query(&sql)
        .bind(concept_id)
        .bind(student_ids)
        .fetch_all::<MasteryScoreRow>()
        .await
        .map_err(read_error)
}

pub async fn fetch_engagement_logs(
    client: &ClickHouseClient,
    class_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<EngagementLogRow>> {
    let sql = format!(
        "SELECT ?fields FROM {} \
         WHERE class_id = ? \
           AND timestamp >= fromUnixTimestamp64Milli(?) \
           AND timestamp <= fromUnixTimestamp64Milli(?) \
         ORDER BY timestamp",
        client.table(ENGAGEMENT_LOGS_TABLE)
    );
    client
        .inner()
        .query(&sql)
        .bind(class_id)
        .bind(from.timestamp_millis())
        .bind(to.timestamp_millis())
        .fetch_all::<EngagementLogRow>()
        .await
        .map_err(read_error)
}

/// Count engagement logs of a class (tests and admin).
pub async fn count_engagement_logs(client: &ClickHouseClient, class_id: &str) -> Result<u64> {
    let sql = format!(
        "SELECT count() FROM {} WHERE class_id = ?",
        client.table(ENGAGEMENT_LOGS_TABLE)
    );
    client
        .inner()
        .query(&sql)
        .bind(class_id)
        .fetch_one::<u64>()
        .await
        .map_err(read_error)
}

/// Truncate both tables (test cleanup).
pub async fn truncate_all(client: &ClickHouseClient) -> Result<()> {
    for table in [ENGAGEMENT_LOGS_TABLE, MASTERY_SCORES_TABLE] {
        let sql = format!("TRUNCATE TABLE IF EXISTS {}", client.table(table));
        client
            .inner()
            .query(&sql)
            .execute()
            .await
            .map_err(|e| Error::internal(format!("Truncate error: {e}")))?;
    }
    Ok(())
}
