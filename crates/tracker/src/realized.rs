use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tempo_core::RealizedKey;

/// Cache of cumulative realized milliseconds per
/// `(client, task, estimate)` tuple.
///
/// `tick` advances the displayed value between server refreshes while a
/// session for that key is running; the ticked value is advisory and any
/// server-confirmed `set` overwrites it unconditionally.
#[derive(Debug, Default)]
pub struct RealizedTimeCache {
    inner: RwLock<HashMap<RealizedKey, u64>>,
}

impl RealizedTimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, 0 when the tuple has never been fetched.
    pub fn get(&self, key: &RealizedKey) -> u64 {
        self.read().get(key).copied().unwrap_or(0)
    }

    /// Commit a server-confirmed value. Server wins over local ticks.
    pub fn set(&self, key: RealizedKey, ms: u64) {
        self.write().insert(key, ms);
    }

    /// Advance the displayed value while a session for `key` is active.
    pub fn tick(&self, key: &RealizedKey, delta_ms: u64) {
        let mut map = self.write();
        let value = map.entry(key.clone()).or_insert(0);
        *value = value.saturating_add(delta_ms);
    }

    pub fn clear_all(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RealizedKey, u64>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RealizedKey, u64>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(estimate: &str) -> RealizedKey {
        RealizedKey {
            client_id: "c".to_string(),
            task_id: "t".to_string(),
            estimate_id: estimate.to_string(),
        }
    }

    #[test]
    fn unknown_key_reads_zero() {
        let cache = RealizedTimeCache::new();
        assert_eq!(cache.get(&key("e1")), 0);
    }

    #[test]
    fn tick_accumulates_from_zero() {
        let cache = RealizedTimeCache::new();
        cache.tick(&key("e1"), 1000);
        cache.tick(&key("e1"), 1000);
        assert_eq!(cache.get(&key("e1")), 2000);
    }

    #[test]
    fn server_value_overwrites_ticks() {
        let cache = RealizedTimeCache::new();
        cache.set(key("e1"), 90_000);
        cache.tick(&key("e1"), 1000);
        assert_eq!(cache.get(&key("e1")), 91_000);
        // next server refresh corrects whatever the ticks guessed
        cache.set(key("e1"), 90_500);
        assert_eq!(cache.get(&key("e1")), 90_500);
    }
}
