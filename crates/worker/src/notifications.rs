//! Notification worker for low-engagement alerts.

use std::collections::HashSet;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use classroom_core::{EngagementLevel, SessionSnapshot};
use session_engine::SessionController;
use telemetry::metrics;

/// Notification types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The last closed question of a session with enough students scored red.
    LowEngagement {
        session_id: String,
        class_id: String,
        teacher_id: String,
        participation_rate: f64,
        students: usize,
    },
    /// System alert
    SystemAlert { message: String, severity: String },
}

/// Notification channel.
#[derive(Debug, Clone)]
pub enum NotificationChannel {
    /// Log only (default)
    Log,
    /// JSON POST of the notification
    Webhook { url: String },
}

/// Notification worker.
///
/// Watches the engagement of each session's most recently closed question,
/// which counts answers against joined students. Alerts once per red
/// episode: a session is alerted again only after it has left red.
pub struct NotificationWorker {
    channels: Vec<NotificationChannel>,
    min_students: usize,
    http: reqwest::Client,
    alerted: Mutex<HashSet<String>>,
    last_store_errors: Mutex<u64>,
}

impl NotificationWorker {
    pub fn new(min_students: usize) -> Self {
        Self {
            channels: vec![NotificationChannel::Log],
            min_students,
            http: reqwest::Client::new(),
            alerted: Mutex::new(HashSet::new()),
            last_store_errors: Mutex::new(0),
        }
    }

    pub fn with_channel(mut self, channel: NotificationChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Send a notification on every channel. A failing channel does not stop
    /// the others.
    pub async fn send(&self, notification: Notification) {
        for channel in &self.channels {
            match channel {
                NotificationChannel::Log => {
                    info!(notification = ?notification, "Notification");
                }
                NotificationChannel::Webhook { url } => {
                    let result = self
                        .http
                        .post(url)
                        .json(&notification)
                        .send()
                        .await
                        .and_then(|r| r.error_for_status());
                    if let Err(e) = result {
                        warn!(url = %url, error = %e, "Webhook delivery failed");
                    }
                }
            }
        }
    }

    /// Sessions that should be alerted now, marking them as alerted.
    pub fn pending_alerts(&self, sessions: &[SessionSnapshot]) -> Vec<SessionSnapshot> {
        fn is_red(s: &SessionSnapshot) -> bool {
            s.last_question
                .as_ref()
                .is_some_and(|q| q.level() == EngagementLevel::Red)
        }

        let mut alerted = self.alerted.lock();

        // Forget sessions that ended or recovered.
        alerted.retain(|id| sessions.iter().any(|s| &s.id == id && is_red(s)));

        sessions
            .iter()
            .filter(|s| is_red(s))
            .filter(|s| s.students.len() >= self.min_students)
            .filter(|s| alerted.insert(s.id.clone()))
            .cloned()
            .collect()
    }

    /// Check live sessions and alert on those that turned red.
    pub async fn check_sessions(&self, controller: &SessionController) -> usize {
        let sessions = controller.list().await;
        let pending = self.pending_alerts(&sessions);

        for session in &pending {
            let participation_rate = session
                .last_question
                .as_ref()
                .map(|q| q.participation_rate)
                .unwrap_or_default();

            metrics().low_engagement_alerts.inc();
            self.send(Notification::LowEngagement {
                session_id: session.id.clone(),
                class_id: session.class_id.clone(),
                teacher_id: session.teacher_id.clone(),
                participation_rate,
                students: session.students.len(),
            })
            .await;
        }

        pending.len()
    }

    /// Alert when the learning store has started failing since the last check.
    pub async fn check_store_errors(&self) {
        let current = metrics().store_errors.get();
        let new_errors = {
            let mut last = self.last_store_errors.lock();
            let delta = current.saturating_sub(*last);
            *last = current;
            delta
        };

        if new_errors > 0 {
            self.send(Notification::SystemAlert {
                message: format!("{new_errors} learning store writes failed after retries"),
                severity: "warning".to_string(),
            })
            .await;
        }
    }
}
