//! ClickHouse table schemas.
//!
//! - DateTime64(3) for millisecond precision
//! - LowCardinality for enum-like fields
//! - Mastery history kept as a JSON string column

use classroom_core::{Error, Result};
use tracing::debug;

use crate::client::ClickHouseClient;

pub const ENGAGEMENT_LOGS_TABLE: &str = "engagement_logs";
pub const MASTERY_SCORES_TABLE: &str = "mastery_scores";

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {database}")
}

/// One row per closed question.
pub fn create_engagement_logs_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{ENGAGEMENT_LOGS_TABLE} (
    session_id String,
    class_id String,
    teacher_id String,
    concept_id String,
    timestamp DateTime64(3),
    participation_rate Float64,
    engagement_level LowCardinality(String),
    active_students UInt32,
    total_students UInt32,
    average_response_time Float64,
    correct_response_rate Float64
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (class_id, timestamp, session_id)
SETTINGS index_granularity = 8192
"#
    )
}

/// Latest record per (student, concept); older versions collapse on merge,
/// reads use FINAL.
pub fn create_mastery_scores_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{MASTERY_SCORES_TABLE} (
    student_id String,
    concept_id String,
    accuracy UInt8,
    consistency UInt8,
    speed UInt8,
    overall_score UInt8,
    attempts UInt32,
    last_attempt_at DateTime64(3),
    history String,
    created_at DateTime64(3),
    updated_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (student_id, concept_id)
"#
    )
}

/// Creates the database and all tables if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let database = &client.config().database;

    client
        .bootstrap()
        .query(&create_database(database))
        .execute()
        .await
        .map_err(|e| Error::internal(format!("Schema init error: {e}")))?;

    for sql in [
        create_engagement_logs_table(database),
        create_mastery_scores_table(database),
    ] {
        client
            .inner()
            .query(&sql)
            .execute()
            .await
            .map_err(|e| Error::internal(format!("Schema init error: {e}")))?;
    }

    debug!(%database, "ClickHouse schema initialized");
    Ok(())
}
