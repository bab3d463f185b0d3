//! Insert helpers for ClickHouse.

use std::time::Instant;

use classroom_core::error::StoreErrorCode;
use classroom_core::{Error, Result};
use clickhouse::Row;
use serde::Serialize;
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::rows::{EngagementLogRow, MasteryScoreRow};
use crate::schema::{ENGAGEMENT_LOGS_TABLE, MASTERY_SCORES_TABLE};

fn write_error(context: &str, e: clickhouse::error::Error) -> Error {
    Error::store(StoreErrorCode::WriteFailed, format!("{context}: {e}"))
}

async fn insert_rows<T>(client: &ClickHouseClient, table: &str, rows: &[T]) -> Result<usize>
where
    T: Row + Serialize,
{
    if rows.is_empty() {
        return Ok(0);
    }

    let start = Instant::now();
    let table = client.table(table);

    let mut insert = client
        .inner()
        .insert(&table)
        .map_err(|e| write_error("Insert error", e))?;

    for row in rows {
        insert
            .write(row)
            .await
            .map_err(|e| write_error("Write error", e))?;
    }

    insert.end().await.map_err(|e| write_error("End error", e))?;

    debug!(
        %table,
        rows = rows.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Inserted rows"
    );
    Ok(rows.len())
}

pub async fn insert_engagement_logs(
    client: &ClickHouseClient,
    rows: &[EngagementLogRow],
) -> Result<usize> {
    insert_rows(client, ENGAGEMENT_LOGS_TABLE, rows).await
}

/// Writes a new version of each record; the replacing engine keeps the one
/// with the latest `updated_at`.
pub async fn insert_mastery_scores(
    client: &ClickHouseClient,
    rows: &[MasteryScoreRow],
) -> Result<usize> {
    insert_rows(client, MASTERY_SCORES_TABLE, rows).await
}
