//! Process-wide key/value store with per-entry expiration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current Unix time in seconds, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Key/value store with absolute per-key expiration.
///
/// `get` never returns a logically expired entry. There are no cross-key
/// transactions; callers sequence multi-key updates themselves.
pub trait TokenStore: Send + Sync {
    fn set(&self, key: &str, value: String, ttl: Duration);
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&self, key: &str);
    /// Snapshot of live keys, used by the expiry sweeper.
    fn keys(&self) -> Vec<String>;
}

struct Entry {
    value: String,
    expires_at: u64,
}

/// In-process [`TokenStore`] with lazy eviction.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new [`MemoryStore`].
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl TokenStore for MemoryStore {
    fn set(&self, key: &str, value: String, ttl: Duration) {
        let expires_at = self.clock.now() + ttl.as_secs();
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_owned(), Entry { value, expires_at });
    }

    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > self.clock.now() => {
                Some(entry.value.clone())
            },
            Some(_) => {
                entries.remove(key);
                None
            },
            None => None,
        }
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .expect("store mutex poisoned")
            .remove(key);
    }

    fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.retain(|_, entry| entry.expires_at > now);
        entries.keys().cloned().collect()
    }
}

#[cfg(test)]
pub(crate) struct ManualClock(Mutex<u64>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: u64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(start)))
    }

    pub fn advance(&self, secs: u64) {
        *self.0.lock().unwrap() += secs;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> u64 {
        *self.0.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new(ManualClock::new(1_000));

        store.set("k", "v".into(), Duration::from_secs(60));
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_get_never_returns_expired_entry() {
        let clock = ManualClock::new(1_000);
        let store = MemoryStore::new(clock.clone());

        store.set("k", "v".into(), Duration::from_secs(60));
        clock.advance(59);
        assert!(store.get("k").is_some());

        clock.advance(1);
        assert_eq!(store.get("k"), None);
        // a later re-insert works as usual.
        store.set("k", "v2".into(), Duration::from_secs(60));
        assert_eq!(store.get("k").as_deref(), Some("v2"));
    }

    #[test]
    fn test_set_overwrites_ttl() {
        let clock = ManualClock::new(0);
        let store = MemoryStore::new(clock.clone());

        store.set("k", "v".into(), Duration::from_secs(10));
        store.set("k", "v".into(), Duration::from_secs(100));
        clock.advance(50);
        assert!(store.get("k").is_some());
    }

    #[test]
    fn test_keys_skips_expired() {
        let clock = ManualClock::new(0);
        let store = MemoryStore::new(clock.clone());

        store.set("a", "1".into(), Duration::from_secs(10));
        store.set("b", "2".into(), Duration::from_secs(100));
        clock.advance(50);

        assert_eq!(store.keys(), vec!["b".to_owned()]);
    }
}
