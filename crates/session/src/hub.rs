//! Per-session broadcast topics.
//!
//! One `tokio::sync::broadcast` channel per session id. Topics are created on
//! first subscribe, so clients may subscribe before the session exists.
//! Closing a topic drops its sender; receivers drain and then see `Closed`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use classroom_core::ServerEvent;

pub type EventReceiver = broadcast::Receiver<Arc<ServerEvent>>;

pub struct SessionHub {
    topics: RwLock<HashMap<String, broadcast::Sender<Arc<ServerEvent>>>>,
    capacity: usize,
}

impl SessionHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, session_id: &str) -> EventReceiver {
        if let Some(tx) = self.topics.read().get(session_id) {
            return tx.subscribe();
        }

        self.topics
            .write()
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Sends to every subscriber of the topic. Returns the number of
    /// receivers; publishing to a topic nobody subscribed to is a no-op.
    pub fn publish(&self, session_id: &str, event: ServerEvent) -> usize {
        let topics = self.topics.read();
        let Some(tx) = topics.get(session_id) else {
            debug!(session_id, event = event.event_name(), "No subscribers");
            return 0;
        };
        tx.send(Arc::new(event)).unwrap_or(0)
    }

    pub fn close(&self, session_id: &str) {
        if self.topics.write().remove(session_id).is_some() {
            debug!(session_id, "Topic closed");
        }
    }

    /// Drops the topic if nobody is subscribed to it. Returns whether it
    /// was removed.
    pub fn release(&self, session_id: &str) -> bool {
        let mut topics = self.topics.write();
        let idle = topics
            .get(session_id)
            .is_some_and(|tx| tx.receiver_count() == 0);
        if idle {
            topics.remove(session_id);
            debug!(session_id, "Topic released");
        }
        idle
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }
}
