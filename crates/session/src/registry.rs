//! Active session registry.
//!
//! Maps session ids to their state. Each session sits behind its own async
//! mutex; the map lock is only held long enough to look up or swap an entry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use classroom_core::Session;

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Returns the session, creating it with `create` if absent. The flag is
    /// true when this call created it.
    pub fn get_or_create(
        &self,
        session_id: &str,
        create: impl FnOnce() -> Session,
    ) -> (SessionHandle, bool) {
        if let Some(handle) = self.get(session_id) {
            return (handle, false);
        }

        let mut sessions = self.sessions.write();
        if let Some(handle) = sessions.get(session_id) {
            return (handle.clone(), false);
        }
        let handle = Arc::new(Mutex::new(create()));
        sessions.insert(session_id.to_string(), handle.clone());
        (handle, true)
    }

    /// Locks the session, provided it is still registered once the lock is
    /// acquired. A session ended while we waited yields `None`.
    pub async fn lock(&self, session_id: &str) -> Option<OwnedMutexGuard<Session>> {
        let handle = self.get(session_id)?;
        let guard = handle.clone().lock_owned().await;
        self.is_current(session_id, &handle).then_some(guard)
    }

    /// Removes the entry if it still refers to `handle`.
    pub fn remove_if_current(&self, session_id: &str, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write();
        if sessions
            .get(session_id)
            .is_some_and(|h| Arc::ptr_eq(h, handle))
        {
            sessions.remove(session_id);
            true
        } else {
            false
        }
    }

    fn is_current(&self, session_id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .read()
            .get(session_id)
            .is_some_and(|h| Arc::ptr_eq(h, handle))
    }

    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
