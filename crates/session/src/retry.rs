//! Bounded retry for learning store calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use classroom_core::Result;
use telemetry::metrics;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff grows linearly with the attempt number
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// retries are used up. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = policy.backoff * attempt;
                warn!(
                    operation,
                    attempt,
                    backoff_ms = %backoff.as_millis(),
                    error = %e,
                    "Retrying store call"
                );
                metrics().store_retries.inc();
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
