//! Process-local cache tier.
//!
//! A lock-guarded map with per-entry TTL. Expiration is lazy: nothing
//! scans for stale entries, but a read that discovers one drops it.
//! All operations are safe under concurrent callers; no method holds the
//! lock across anything blocking.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;

use wardstat_core::Clock;

use crate::entry::CacheEntry;

/// Bounded (optionally) process-local key/value store with per-entry TTL.
pub struct LocalCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    max_entries: Option<usize>,
}

impl LocalCache {
    /// Create a local tier reading time from `clock`, bounded to
    /// `max_entries` when given.
    pub fn new(clock: Arc<dyn Clock>, max_entries: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries,
        }
    }

    // A poisoned lock means a panic happened mid-operation elsewhere; the
    // map itself is still structurally sound, so reads and writes continue
    // on the recovered guard.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `value` under `key` for `ttl`, overwriting unconditionally
    /// (last writer wins, no version check).
    ///
    /// Returns the key displaced to stay under the configured bound, if
    /// any. Replacing an existing key never displaces anything.
    pub fn put(&self, key: &str, value: Value, ttl: Duration) -> Option<String> {
        let now = self.clock.now();
        let entry = CacheEntry::new(value, ttl, now);
        let mut entries = self.write();

        let mut displaced = None;
        if let Some(max) = self.max_entries {
            if !entries.contains_key(key) && entries.len() >= max {
                entries.retain(|_, e| !e.is_expired(now));
                if entries.len() >= max {
                    // Still full: drop the entry closest to expiry.
                    displaced = entries
                        .iter()
                        .min_by_key(|(_, e)| e.expires_at)
                        .map(|(k, _)| k.clone());
                    if let Some(k) = &displaced {
                        entries.remove(k);
                    }
                }
            }
        }

        entries.insert(key.to_string(), entry);
        displaced
    }

    /// Return the value under `key` if present and unexpired.
    ///
    /// A read that discovers an expired entry removes it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        {
            let entries = self.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: upgrade to a write lock and re-check, another caller may
        // have replaced the entry in between.
        let mut entries = self.write();
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Presence check honoring TTL, without touching the entry.
    pub fn exists(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.read()
            .get(key)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    /// Remove one key. Returns whether an entry was present.
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Remove every key starting with `prefix`. Linear scan over all
    /// entries. Returns the removed keys.
    pub fn remove_by_prefix(&self, prefix: &str) -> Vec<String> {
        let mut entries = self.write();
        let removed: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &removed {
            entries.remove(key);
        }
        removed
    }

    /// Empty the tier. Returns the removed keys.
    pub fn clear(&self) -> Vec<String> {
        let mut entries = self.write();
        let removed: Vec<String> = entries.keys().cloned().collect();
        entries.clear();
        removed
    }

    /// Number of entries currently held, expired stragglers included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all keys, for region composition reporting.
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("entries", &self.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use wardstat_core::ManualClock;

    fn cache_with_manual_clock() -> (LocalCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = LocalCache::new(clock.clone(), None);
        (cache, clock)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (cache, _clock) = cache_with_manual_clock();
        cache.put("ward_statistics:1", json!({"pop": 100}), Duration::from_secs(60));
        assert_eq!(
            cache.get("ward_statistics:1"),
            Some(json!({"pop": 100}))
        );
        assert!(cache.exists("ward_statistics:1"));
    }

    #[test]
    fn test_get_misses_after_ttl() {
        let (cache, clock) = cache_with_manual_clock();
        cache.put("k", json!(1), Duration::from_secs(30));

        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.get("k"), Some(json!(1)));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.exists("k"));
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let (cache, clock) = cache_with_manual_clock();
        cache.put("k", json!(1), Duration::from_secs(10));
        clock.advance(Duration::from_secs(11));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_put_overwrites_unconditionally() {
        let (cache, _clock) = cache_with_manual_clock();
        cache.put("k", json!("old"), Duration::from_secs(60));
        cache.put("k", json!("new"), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!("new")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_by_prefix_is_exact() {
        let (cache, _clock) = cache_with_manual_clock();
        cache.put("a:1", json!(1), Duration::from_secs(60));
        cache.put("a:2", json!(2), Duration::from_secs(60));
        cache.put("b:1", json!(3), Duration::from_secs(60));

        let mut removed = cache.remove_by_prefix("a:");
        removed.sort();
        assert_eq!(removed, vec!["a:1".to_string(), "a:2".to_string()]);
        assert_eq!(cache.get("a:1"), None);
        assert_eq!(cache.get("a:2"), None);
        assert_eq!(cache.get("b:1"), Some(json!(3)));
    }

    #[test]
    fn test_clear_returns_all_keys() {
        let (cache, _clock) = cache_with_manual_clock();
        cache.put("a", json!(1), Duration::from_secs(60));
        cache.put("b", json!(2), Duration::from_secs(60));
        assert_eq!(cache.clear().len(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound_displaces_closest_to_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = LocalCache::new(clock.clone(), Some(2));

        cache.put("short", json!(1), Duration::from_secs(10));
        cache.put("long", json!(2), Duration::from_secs(1000));
        let displaced = cache.put("third", json!(3), Duration::from_secs(100));

        assert_eq!(displaced, Some("short".to_string()));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long"), Some(json!(2)));
        assert_eq!(cache.get("third"), Some(json!(3)));
    }

    #[test]
    fn test_capacity_bound_purges_expired_first() {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = LocalCache::new(clock.clone(), Some(2));

        cache.put("stale", json!(1), Duration::from_secs(5));
        cache.put("live", json!(2), Duration::from_secs(1000));
        clock.advance(Duration::from_secs(6));

        let displaced = cache.put("fresh", json!(3), Duration::from_secs(100));
        assert_eq!(displaced, None);
        assert_eq!(cache.get("live"), Some(json!(2)));
        assert_eq!(cache.get("fresh"), Some(json!(3)));
    }

    #[test]
    fn test_concurrent_puts_leave_one_winner() {
        let clock: Arc<dyn Clock> = Arc::new(wardstat_core::SystemClock);
        let cache = Arc::new(LocalCache::new(clock, None));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.put("contested", json!(i), Duration::from_secs(60));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), 1);
        let winner = cache.get("contested").unwrap();
        assert!(winner.as_i64().unwrap() < 16);
    }

    proptest! {
        #[test]
        fn prop_remove_by_prefix_removes_exactly_matching(
            keys in proptest::collection::hash_set("[a-c]:[0-9]{1,2}", 1..20),
            prefix in "[a-c]:",
        ) {
            let clock: Arc<dyn Clock> = Arc::new(wardstat_core::SystemClock);
            let cache = LocalCache::new(clock, None);
            for key in &keys {
                cache.put(key, json!(1), Duration::from_secs(60));
            }

            let removed = cache.remove_by_prefix(&prefix);
            for key in &keys {
                if key.starts_with(&prefix) {
                    prop_assert!(removed.contains(key));
                    prop_assert!(cache.get(key).is_none());
                } else {
                    prop_assert!(cache.get(key).is_some());
                }
            }
        }
    }
}
