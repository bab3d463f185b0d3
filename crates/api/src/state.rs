//! Application state shared across handlers.

use std::time::Instant;

use session_engine::SessionController;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Live session engine
    pub controller: SessionController,
    /// Process start, reported by the metrics endpoint
    pub started_at: Instant,
}

impl AppState {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller,
            started_at: Instant::now(),
        }
    }
}
