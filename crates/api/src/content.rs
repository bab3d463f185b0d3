//! Content service client.
//!
//! Fetches authored questions over HTTP (`GET {base}/questions/{id}`).
//! Found questions are cached; misses are not, so newly authored content
//! shows up on the next push.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, warn};

use classroom_core::error::ContentErrorCode;
use classroom_core::{ContentStore, Error, Question, Result};
use telemetry::{health, metrics};

/// Cache TTL for questions (5 minutes).
const QUESTION_CACHE_TTL: Duration = Duration::from_secs(300);

/// Maximum cache entries.
const QUESTION_CACHE_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
pub struct ContentClient {
    /// Content service URL (e.g., "http://content-service:8080")
    base_url: String,
    http_client: reqwest::Client,
    cache: Cache<String, Question>,
}

impl ContentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            cache: Cache::builder()
                .max_capacity(QUESTION_CACHE_MAX_CAPACITY)
                .time_to_live(QUESTION_CACHE_TTL)
                .build(),
        })
    }

    async fn fetch(&self, question_id: &str) -> Result<Option<Question>> {
        let url = format!("{}/questions/{}", self.base_url, question_id);
        debug!(url = %url, "Fetching question");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "Content service request failed");
            health().content.set_unhealthy(e.to_string());
            Error::content(
                ContentErrorCode::Unavailable,
                format!("Content service unavailable: {e}"),
            )
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            health().content.set_healthy();
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Content service returned error");
            health()
                .content
                .set_unhealthy(format!("content service returned {status}"));
            return Err(Error::content(
                ContentErrorCode::Unavailable,
                format!("Content service returned {status}"),
            ));
        }

        let question: Question = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse question");
            Error::content(
                ContentErrorCode::Unavailable,
                format!("Invalid question document: {e}"),
            )
        })?;

        health().content.set_healthy();
        Ok(Some(question))
    }
}

#[async_trait]
impl ContentStore for ContentClient {
    async fn question_by_id(&self, question_id: &str) -> Result<Option<Question>> {
        if let Some(cached) = self.cache.get(question_id).await {
            metrics().content_cache_hits.inc();
            return Ok(Some(cached));
        }

        let fetched = self.fetch(question_id).await?;
        if let Some(question) = &fetched {
            self.cache
                .insert(question_id.to_string(), question.clone())
                .await;
        }
        Ok(fetched)
    }
}
