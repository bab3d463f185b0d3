//! Session reaper.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use session_engine::SessionController;
use telemetry::metrics;

/// Ends sessions whose teacher never closed them.
pub struct SessionReaper {
    controller: SessionController,
}

impl SessionReaper {
    pub fn new(controller: SessionController) -> Self {
        Self { controller }
    }

    /// Ends every session expired at `now`. Returns how many were ended.
    pub async fn run_once(&self, now: DateTime<Utc>) -> usize {
        let expired = self.controller.expired_sessions(now).await;
        if expired.is_empty() {
            debug!("No expired sessions");
            return 0;
        }

        let mut reaped = 0;
        for session_id in expired {
            if let Some(summary) = self.controller.end(&session_id).await {
                metrics().sessions_reaped.inc();
                info!(
                    %session_id,
                    questions_asked = summary.questions_asked,
                    average_engagement = summary.average_engagement,
                    "Reaped expired session"
                );
                reaped += 1;
            }
        }
        reaped
    }
}
