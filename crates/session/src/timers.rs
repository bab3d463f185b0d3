//! Auto-close timers.
//!
//! At most one pending timer per session, tagged with the question it will
//! close. Scheduling a new one aborts the previous. The close itself runs in
//! its own task, so aborting a timer that already fired is harmless.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

#[derive(Default)]
pub struct AutoCloseTimers {
    pending: Mutex<HashMap<String, (String, AbortHandle)>>,
}

impl AutoCloseTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `on_fire` after `delay` unless cancelled first.
    pub fn schedule<F>(&self, session_id: &str, question_id: &str, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(on_fire);
        });

        let previous = self.pending.lock().insert(
            session_id.to_string(),
            (question_id.to_string(), task.abort_handle()),
        );
        if let Some((old_question, handle)) = previous {
            handle.abort();
            debug!(session_id, question_id = %old_question, "Auto-close cancelled");
        }
    }

    /// Aborts the session's timer only if it belongs to `question_id`.
    pub fn cancel_question(&self, session_id: &str, question_id: &str) -> bool {
        let mut pending = self.pending.lock();
        if !pending
            .get(session_id)
            .is_some_and(|(q, _)| q == question_id)
        {
            return false;
        }
        if let Some((_, handle)) = pending.remove(session_id) {
            handle.abort();
        }
        true
    }

    /// Aborts the session's pending timer, if any.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.pending.lock().remove(session_id) {
            Some((question_id, handle)) => {
                handle.abort();
                debug!(session_id, %question_id, "Auto-close cancelled");
                true
            }
            None => false,
        }
    }

    /// Question the session's pending timer will close.
    pub fn pending_question(&self, session_id: &str) -> Option<String> {
        self.pending.lock().get(session_id).map(|(q, _)| q.clone())
    }
}
