use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tempo_core::ActiveSession;

/// In-memory map of `estimate_id -> ActiveSession`, the single source of
/// truth for "is a session running for this estimate".
///
/// Pure data structure: no side effects, no network. Every rendered
/// start/stop control queries it on each render pass and each tick, so
/// lookups are O(1) by `estimate_id`.
///
/// The map never holds more than one entry: `set` evicts anything else as
/// a backstop for the one-session-per-user invariant (the controller is
/// the real enforcement; it stops the previous session first).
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, ActiveSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_active(&self, estimate_id: &str) -> Option<ActiveSession> {
        self.read().get(estimate_id).cloned()
    }

    pub fn get_any_active(&self) -> Option<ActiveSession> {
        self.read().values().next().cloned()
    }

    pub fn set(&self, session: ActiveSession) {
        let mut map = self.write();
        map.clear();
        map.insert(session.estimate_id.clone(), session);
    }

    pub fn clear(&self, estimate_id: &str) -> Option<ActiveSession> {
        self.write().remove(estimate_id)
    }

    pub fn clear_all(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ActiveSession>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ActiveSession>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
