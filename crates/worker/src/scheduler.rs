//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::info;

use session_engine::SessionController;
use telemetry::metrics;

use crate::notifications::{NotificationChannel, NotificationWorker};
use crate::reaper::SessionReaper;

/// Worker scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Session reaper interval
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Low-engagement check interval
    #[serde(default = "default_notification_check_interval_secs")]
    pub notification_check_interval_secs: u64,
    /// Metrics log interval
    #[serde(default = "default_metrics_log_interval_secs")]
    pub metrics_log_interval_secs: u64,
    /// Optional webhook receiving notifications as JSON
    pub webhook_url: Option<String>,
}

fn default_reaper_interval_secs() -> u64 {
    60
}

fn default_notification_check_interval_secs() -> u64 {
    30
}

fn default_metrics_log_interval_secs() -> u64 {
    60
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            reaper_interval_secs: default_reaper_interval_secs(),
            notification_check_interval_secs: default_notification_check_interval_secs(),
            metrics_log_interval_secs: default_metrics_log_interval_secs(),
            webhook_url: None,
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    controller: SessionController,
    notifications: NotificationWorker,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, controller: SessionController) -> Self {
        let mut notifications =
            NotificationWorker::new(controller.config().min_students_for_alerts);
        if let Some(url) = config.webhook_url.clone() {
            notifications = notifications.with_channel(NotificationChannel::Webhook { url });
        }

        Self {
            config,
            controller,
            notifications,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_reaper().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_notification_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_reaper(&self) {
        let reaper = SessionReaper::new(self.controller.clone());
        let mut ticker = interval(Duration::from_secs(self.config.reaper_interval_secs));

        loop {
            ticker.tick().await;
            reaper.run_once(Utc::now()).await;
        }
    }

    async fn run_notification_worker(&self) {
        let mut ticker = interval(Duration::from_secs(
            self.config.notification_check_interval_secs,
        ));

        loop {
            ticker.tick().await;
            self.notifications.check_sessions(&self.controller).await;
            self.notifications.check_store_errors().await;
        }
    }

    async fn run_metrics_log(&self) {
        let mut ticker = interval(Duration::from_secs(self.config.metrics_log_interval_secs));

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                active_sessions = snapshot.active_sessions,
                active_connections = snapshot.active_connections,
                questions_pushed = snapshot.questions_pushed,
                answers_received = snapshot.answers_received,
                mastery_updates = snapshot.mastery_updates,
                store_errors = snapshot.store_errors,
                "Metrics"
            );
        }
    }
}
