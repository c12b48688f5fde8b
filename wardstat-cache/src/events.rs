//! Listener notification.
//!
//! Mutations broadcast to registered listeners by plain iteration. Each
//! listener is isolated: a panic in one is caught, logged, and never
//! reaches the caller that triggered the event or the listeners after it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use tracing::warn;

use wardstat_core::EvictionReason;

use crate::traits::CacheEventListener;

/// Registry and broadcaster for cache event listeners.
#[derive(Default)]
pub struct EventNotifier {
    listeners: RwLock<Vec<Arc<dyn CacheEventListener>>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener to the notification list.
    pub fn register(&self, listener: Arc<dyn CacheEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Broadcast an update for `key`.
    pub fn notify_update(&self, key: &str) {
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_update(key))).is_err() {
                warn!(key, "cache event listener panicked in on_update");
            }
        }
    }

    /// Broadcast an eviction of `key`.
    pub fn notify_eviction(&self, key: &str, reason: EvictionReason) {
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_eviction(key, reason))).is_err() {
                warn!(key, reason = %reason, "cache event listener panicked in on_eviction");
            }
        }
    }

    // Callbacks run outside the lock so a slow listener cannot block
    // registration.
    fn snapshot(&self) -> Vec<Arc<dyn CacheEventListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingListener {
        updates: AtomicUsize,
        evictions: AtomicUsize,
    }

    impl CacheEventListener for RecordingListener {
        fn on_update(&self, _key: &str) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn on_eviction(&self, _key: &str, _reason: EvictionReason) {
            self.evictions.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingListener;

    impl CacheEventListener for PanickingListener {
        fn on_update(&self, _key: &str) {
            panic!("listener bug");
        }

        fn on_eviction(&self, _key: &str, _reason: EvictionReason) {
            panic!("listener bug");
        }
    }

    #[test]
    fn test_listeners_receive_events() {
        let notifier = EventNotifier::new();
        let listener = Arc::new(RecordingListener::default());
        notifier.register(listener.clone());

        notifier.notify_update("k");
        notifier.notify_eviction("k", EvictionReason::Explicit);

        assert_eq!(listener.updates.load(Ordering::SeqCst), 1);
        assert_eq!(listener.evictions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_starve_others() {
        let notifier = EventNotifier::new();
        let healthy = Arc::new(RecordingListener::default());
        notifier.register(Arc::new(PanickingListener));
        notifier.register(healthy.clone());

        notifier.notify_update("k");
        notifier.notify_eviction("k", EvictionReason::Clear);

        assert_eq!(healthy.updates.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.evictions.load(Ordering::SeqCst), 1);
    }
}
