//! In-process metrics.
//!
//! Lock-free counters, gauges and latency histograms in a global registry.
//! Snapshots are served over HTTP and logged periodically by the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the classroom engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Session lifecycle
    pub sessions_started: Counter,
    pub sessions_ended: Counter,
    pub sessions_reaped: Counter,
    pub students_joined: Counter,

    // Question lifecycle
    pub questions_pushed: Counter,
    pub questions_replaced: Counter,
    pub questions_closed: Counter,
    pub questions_not_found: Counter,

    // Answers
    pub answers_received: Counter,
    pub answers_stale: Counter,
    pub invalid_frames: Counter,

    // Learning store
    pub mastery_updates: Counter,
    pub engagement_logs_written: Counter,
    pub store_errors: Counter,
    pub store_retries: Counter,

    // Content service
    pub content_cache_hits: Counter,
    pub content_errors: Counter,

    // Alerts
    pub low_engagement_alerts: Counter,

    // Latency histograms
    pub answer_latency_ms: Histogram,
    pub mastery_update_latency_ms: Histogram,
    pub content_fetch_latency_ms: Histogram,

    // Gauges
    pub active_sessions: Gauge,
    pub active_connections: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub sessions_reaped: u64,
    pub students_joined: u64,
    pub questions_pushed: u64,
    pub questions_replaced: u64,
    pub questions_closed: u64,
    pub questions_not_found: u64,
    pub answers_received: u64,
    pub answers_stale: u64,
    pub invalid_frames: u64,
    pub mastery_updates: u64,
    pub engagement_logs_written: u64,
    pub store_errors: u64,
    pub store_retries: u64,
    pub content_cache_hits: u64,
    pub content_errors: u64,
    pub low_engagement_alerts: u64,
    pub answer_latency_mean_ms: f64,
    pub mastery_update_latency_mean_ms: f64,
    pub content_fetch_latency_mean_ms: f64,
    pub active_sessions: u64,
    pub active_connections: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            sessions_started: self.sessions_started.get(),
            sessions_ended: self.sessions_ended.get(),
            sessions_reaped: self.sessions_reaped.get(),
            students_joined: self.students_joined.get(),
            questions_pushed: self.questions_pushed.get(),
            questions_replaced: self.questions_replaced.get(),
            questions_closed: self.questions_closed.get(),
            questions_not_found: self.questions_not_found.get(),
            answers_received: self.answers_received.get(),
            answers_stale: self.answers_stale.get(),
            invalid_frames: self.invalid_frames.get(),
            mastery_updates: self.mastery_updates.get(),
            engagement_logs_written: self.engagement_logs_written.get(),
            store_errors: self.store_errors.get(),
            store_retries: self.store_retries.get(),
            content_cache_hits: self.content_cache_hits.get(),
            content_errors: self.content_errors.get(),
            low_engagement_alerts: self.low_engagement_alerts.get(),
            answer_latency_mean_ms: self.answer_latency_ms.mean(),
            mastery_update_latency_mean_ms: self.mastery_update_latency_ms.mean(),
            content_fetch_latency_mean_ms: self.content_fetch_latency_ms.mean(),
            active_sessions: self.active_sessions.get(),
            active_connections: self.active_connections.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
