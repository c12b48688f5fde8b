//! Cache contracts: cacheable entities, event listeners, and the
//! distributed store abstraction.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use wardstat_core::{
    keys, CacheResult, Clock, DemographicBreakdown, EvictionReason, WardDemographicSummary,
};

/// Capability trait for entities that can describe their own caching.
///
/// Implementations decide the key, the TTL, and whether a given instance
/// should be cached at all. Multiple unrelated entity types implement this
/// without sharing any base type.
///
/// # Implementation Requirements
///
/// - `cache_key()` must be stable for a given instance
/// - `cache_ttl()` must be non-negative (guaranteed by `Duration`)
/// - `update_cache_timestamp()` records on the entity itself when a copy
///   was last stored; the manager calls it before serializing
pub trait Cacheable {
    /// The key this entity is stored under.
    fn cache_key(&self) -> String;

    /// How long cached copies stay valid.
    fn cache_ttl(&self) -> Duration;

    /// Whether this instance should be cached. The manager treats a `false`
    /// as a silent no-op.
    fn is_cacheable(&self) -> bool;

    /// Record the time of caching on the entity, using the given clock.
    fn update_cache_timestamp(&mut self, clock: &dyn Clock);
}

/// Observer for cache mutations.
///
/// Listeners are called synchronously after the mutation. A panicking
/// listener is isolated and logged; it never fails the cache operation or
/// starves other listeners.
pub trait CacheEventListener: Send + Sync {
    /// A value was stored (or replaced) under `key`.
    fn on_update(&self, key: &str);

    /// An entry left the cache.
    fn on_eviction(&self, key: &str, reason: EvictionReason);
}

/// Contract for the shared, cross-instance tier.
///
/// Implementations are clients of an existing store (Redis in production);
/// replication and consistency are that store's concern. Every method may
/// fail with a backend error - the manager, not the store, decides to fail
/// open.
#[async_trait]
pub trait DistributedStore: Send + Sync {
    /// Store `value` under `key` for `ttl`. A zero TTL is equivalent to
    /// deleting the key.
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()>;

    /// Fetch the value under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Presence check without transferring the value.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Delete one key. Returns the number of entries removed (0 or 1).
    async fn delete(&self, key: &str) -> CacheResult<u64>;

    /// Delete every key starting with `prefix`. Returns the number removed.
    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Delete everything this store holds (scoped to its namespace).
    /// Returns the number removed.
    async fn clear(&self) -> CacheResult<u64>;

    /// Number of entries this store holds (scoped to its namespace).
    async fn len(&self) -> CacheResult<u64>;

    /// Cheap liveness probe.
    async fn ping(&self) -> CacheResult<()>;
}

// ============================================================================
// CACHEABLE IMPLEMENTATIONS FOR DOMAIN ENTITIES
// ============================================================================

impl Cacheable for WardDemographicSummary {
    fn cache_key(&self) -> String {
        keys::entity_key(keys::WARD_STATISTICS_PREFIX, self.ward_id, Self::CACHE_VERSION)
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(3600)
    }

    fn is_cacheable(&self) -> bool {
        // Placeholder rows from partial aggregations carry no population.
        self.ward_id > 0 && self.population_total > 0
    }

    fn update_cache_timestamp(&mut self, clock: &dyn Clock) {
        self.cached_at = Some(clock.now());
    }
}

impl Cacheable for DemographicBreakdown {
    fn cache_key(&self) -> String {
        keys::entity_prefix("demographic", format!("{}:{}", self.dimension, self.ward_id))
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(1800)
    }

    fn is_cacheable(&self) -> bool {
        !self.buckets.is_empty()
    }

    fn update_cache_timestamp(&mut self, clock: &dyn Clock) {
        self.cached_at = Some(clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wardstat_core::SystemClock;

    fn summary(ward_id: i64, population: u64) -> WardDemographicSummary {
        WardDemographicSummary {
            ward_id,
            ward_name: "Test Ward".to_string(),
            population_total: population,
            households: 100,
            median_age: 40.0,
            age_bands: vec![],
            computed_at: Utc::now(),
            cached_at: None,
        }
    }

    #[test]
    fn test_summary_cache_key_convention() {
        assert_eq!(summary(7, 10).cache_key(), "ward_statistics:7:1");
    }

    #[test]
    fn test_empty_summary_is_not_cacheable() {
        assert!(summary(7, 10).is_cacheable());
        assert!(!summary(7, 0).is_cacheable());
        assert!(!summary(0, 10).is_cacheable());
    }

    #[test]
    fn test_update_cache_timestamp_records_time() {
        let mut s = summary(7, 10);
        assert!(s.cached_at.is_none());
        s.update_cache_timestamp(&SystemClock);
        assert!(s.cached_at.is_some());
    }

    #[test]
    fn test_breakdown_key_includes_dimension() {
        let b = DemographicBreakdown {
            ward_id: 3,
            dimension: "tenure".to_string(),
            buckets: vec![("owned".to_string(), 5)],
            computed_at: Utc::now(),
            cached_at: None,
        };
        assert_eq!(b.cache_key(), "demographic:tenure:3");
        assert!(b.is_cacheable());
    }
}
