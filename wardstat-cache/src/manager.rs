//! The cache manager façade.
//!
//! Callers talk only to [`CacheManager`]. Reads consult the local tier
//! first, then the distributed tier; on a full miss they return `None` -
//! recomputation belongs to the caller or to [`CacheManager::refresh`].
//! Writes fan out to the targeted tier(s).
//!
//! # Failure Policy
//!
//! The cache is a performance layer, not a system of record. Distributed
//! failures and timeouts are caught here, logged, and degrade to a miss or
//! no-op (fail-open): cache unavailability costs latency, never
//! correctness. The single exception is a `refresh` whose fetcher fails
//! with no valid local fallback - that error reaches the caller, because
//! it means the source-of-truth computation itself is broken.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use wardstat_core::{
    keys, CacheConfig, CacheError, CacheLevel, CacheResult, Clock, EvictionReason, SystemClock,
    WardId,
};

use crate::events::EventNotifier;
use crate::local::LocalCache;
use crate::region::RegionResolver;
use crate::stats::{CacheStatsSnapshot, StatsCollector};
use crate::traits::{Cacheable, CacheEventListener, DistributedStore};

/// Tiered cache façade over a local and a distributed tier.
///
/// Instantiated once at process start and passed by reference to all
/// consumers - there is no ambient global. All operations take `&self`
/// and are safe under concurrent callers.
///
/// # Example
///
/// ```ignore
/// let store = RedisStore::from_config(&config).await?;
/// let cache = CacheManager::new(Arc::new(store), config);
///
/// cache.put("ward_statistics:7:1", &summary, Duration::from_secs(3600), CacheLevel::All).await?;
/// let summary: Option<WardDemographicSummary> =
///     cache.get("ward_statistics:7:1", CacheLevel::All).await?;
/// ```
pub struct CacheManager<D: DistributedStore> {
    local: LocalCache,
    distributed: Arc<D>,
    regions: RegionResolver,
    stats: StatsCollector,
    notifier: EventNotifier,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<D: DistributedStore> CacheManager<D> {
    /// Create a manager over `distributed`, reading wall-clock time.
    pub fn new(distributed: Arc<D>, config: CacheConfig) -> Self {
        Self::with_clock(distributed, config, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit clock. Tests inject a manual
    /// clock here to drive TTL expiry deterministically.
    pub fn with_clock(distributed: Arc<D>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            local: LocalCache::new(clock.clone(), config.max_local_entries),
            regions: RegionResolver::from_config(&config),
            stats: StatsCollector::new(),
            notifier: EventNotifier::new(),
            distributed,
            config,
            clock,
        }
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn validate_key(key: &str) -> CacheResult<()> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        Ok(())
    }

    /// Run a distributed operation bounded by the configured timeout,
    /// converting failure and timeout into `None` (fail-open). All
    /// distributed traffic goes through here.
    async fn guarded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = CacheResult<T>>,
    ) -> Option<T> {
        match timeout(self.config.operation_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "distributed tier failed, failing open");
                None
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout = ?self.config.operation_timeout,
                    "distributed tier timed out, failing open"
                );
                None
            }
        }
    }

    fn store_local(&self, key: &str, value: Value, ttl: Duration) {
        if let Some(displaced) = self.local.put(key, value, ttl) {
            self.stats.record_evictions(1);
            self.notifier
                .notify_eviction(&displaced, EvictionReason::Capacity);
        }
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Store `value` under `key` for `ttl` at the targeted tier(s).
    ///
    /// The value is visible to subsequent `get`s at those tiers until the
    /// TTL elapses. Increments `puts` exactly once regardless of tier
    /// fan-out and notifies listeners' `on_update`.
    ///
    /// # Errors
    ///
    /// Rejects an empty key before touching any tier. A distributed
    /// failure is not an error: the local write (if targeted) stands.
    pub async fn put<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        level: CacheLevel,
    ) -> CacheResult<()> {
        let json = Self::encode(key, value)?;
        self.put_value(key, json, ttl, ttl, level).await
    }

    /// Store `value` with each tier's configured default TTL: the finer
    /// local default in-process, the coarser distributed default at the
    /// shared tier. Otherwise behaves as [`CacheManager::put`].
    pub async fn put_with_defaults<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        level: CacheLevel,
    ) -> CacheResult<()> {
        let json = Self::encode(key, value)?;
        self.put_value(
            key,
            json,
            self.config.default_local_ttl,
            self.config.default_distributed_ttl,
            level,
        )
        .await
    }

    fn encode<T: Serialize>(key: &str, value: &T) -> CacheResult<Value> {
        Self::validate_key(key)?;
        serde_json::to_value(value).map_err(|e| CacheError::serialization(key, e))
    }

    async fn put_value(
        &self,
        key: &str,
        json: Value,
        local_ttl: Duration,
        distributed_ttl: Duration,
        level: CacheLevel,
    ) -> CacheResult<()> {
        if level.targets_local() {
            self.store_local(key, json.clone(), local_ttl);
        }
        if level.targets_distributed() {
            self.guarded("set", self.distributed.set(key, &json, distributed_ttl))
                .await;
        }

        self.stats.record_put();
        self.notifier.notify_update(key);
        debug!(
            key,
            region = self.regions.resolve(key),
            ttl_secs = local_ttl.as_secs(),
            "cache put"
        );
        Ok(())
    }

    /// Store an entity that describes its own caching.
    ///
    /// Derives key and TTL from the entity, records the caching time on
    /// the entity itself, then behaves as [`CacheManager::put`]. A
    /// non-cacheable entity is a silent no-op.
    pub async fn put_entity<E: Cacheable + Serialize>(
        &self,
        entity: &mut E,
        level: CacheLevel,
    ) -> CacheResult<()> {
        if !entity.is_cacheable() {
            debug!("entity declined caching, skipping");
            return Ok(());
        }
        let key = entity.cache_key();
        let ttl = entity.cache_ttl();
        entity.update_cache_timestamp(self.clock.as_ref());
        self.put(&key, entity, ttl, level).await
    }

    /// Bulk-populate the cache ahead of expected demand.
    ///
    /// Each pair is stored independently; a failing item is logged and
    /// skipped, never aborting the rest. Returns the number stored.
    pub async fn prewarm(
        &self,
        items: impl IntoIterator<Item = (String, Value)>,
        ttl: Duration,
        level: CacheLevel,
    ) -> u64 {
        let mut stored = 0u64;
        for (key, value) in items {
            match self.put(&key, &value, ttl, level).await {
                Ok(()) => stored += 1,
                Err(e) => warn!(key = %key, error = %e, "prewarm item skipped"),
            }
        }
        info!(stored, "cache prewarm complete");
        stored
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// Fetch the value under `key`, checking local before distributed.
    ///
    /// Returns `Some` only for a present, unexpired, type-compatible
    /// value at a targeted tier; a deserialization mismatch at one tier is
    /// treated as a miss there, never an error. On a distributed hit under
    /// [`CacheLevel::All`] the value is copied into the local tier with
    /// the bounded warming TTL (the original TTL is not recoverable).
    ///
    /// Increments `hits` on success, `misses` otherwise.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        level: CacheLevel,
    ) -> CacheResult<Option<T>> {
        Self::validate_key(key)?;

        if level.targets_local() {
            if let Some(value) = self.local.get(key) {
                match serde_json::from_value::<T>(value) {
                    Ok(typed) => {
                        self.stats.record_hit();
                        debug!(key, region = self.regions.resolve(key), tier = "local", "cache hit");
                        return Ok(Some(typed));
                    }
                    Err(e) => {
                        debug!(key, error = %e, "local value type-incompatible, treating as miss");
                    }
                }
            }
        }

        if level.targets_distributed() {
            if let Some(Some(value)) = self.guarded("get", self.distributed.get(key)).await {
                match serde_json::from_value::<T>(value.clone()) {
                    Ok(typed) => {
                        if level == CacheLevel::All {
                            self.store_local(key, value, self.config.warming_ttl);
                        }
                        self.stats.record_hit();
                        debug!(
                            key,
                            region = self.regions.resolve(key),
                            tier = "distributed",
                            "cache hit"
                        );
                        return Ok(Some(typed));
                    }
                    Err(e) => {
                        debug!(key, error = %e, "distributed value type-incompatible, treating as miss");
                    }
                }
            }
        }

        self.stats.record_miss();
        debug!(key, region = self.regions.resolve(key), "cache miss");
        Ok(None)
    }

    /// Presence check honoring TTL, without transferring the value.
    /// Does not touch the hit/miss counters.
    pub async fn exists(&self, key: &str, level: CacheLevel) -> CacheResult<bool> {
        Self::validate_key(key)?;
        if level.targets_local() && self.local.exists(key) {
            return Ok(true);
        }
        if level.targets_distributed() {
            if let Some(true) = self.guarded("exists", self.distributed.exists(key)).await {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Always invoke the fetcher, store its result, and return it.
    ///
    /// On fetcher failure the last known unexpired local value is returned
    /// instead when one exists; otherwise the failure propagates as
    /// [`CacheError::RefreshFailed`] - a broken source-of-truth
    /// computation is the one failure this layer does not swallow.
    ///
    /// Concurrent callers racing on the same key may each invoke the
    /// fetcher; no single-flight deduplication is attempted.
    pub async fn refresh<T, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl: Duration,
        level: CacheLevel,
    ) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        Self::validate_key(key)?;
        match fetcher().await {
            Ok(value) => {
                self.put(key, &value, ttl, level).await?;
                Ok(value)
            }
            Err(e) => {
                warn!(key, error = %e, "refresh fetcher failed");
                if let Some(stale) = self.local.get(key) {
                    if let Ok(typed) = serde_json::from_value::<T>(stale) {
                        debug!(key, "serving last known local value after fetcher failure");
                        return Ok(typed);
                    }
                }
                Err(CacheError::RefreshFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    // ========================================================================
    // EVICTION & INVALIDATION
    // ========================================================================

    /// Remove one key from the targeted tier(s).
    ///
    /// Increments `evictions` and notifies listeners' `on_eviction`.
    pub async fn evict(&self, key: &str, level: CacheLevel) -> CacheResult<()> {
        Self::validate_key(key)?;
        if level.targets_local() {
            self.local.remove(key);
        }
        if level.targets_distributed() {
            self.guarded("delete", self.distributed.delete(key)).await;
        }
        self.stats.record_evictions(1);
        self.notifier.notify_eviction(key, EvictionReason::Explicit);
        debug!(key, "cache evict");
        Ok(())
    }

    /// Remove every entry whose key starts with `prefix` from the
    /// targeted tier(s). Returns the number of tier entries removed.
    ///
    /// Listeners are notified per key removed from the local tier; the
    /// distributed store only reports a count, not which keys a pattern
    /// delete matched.
    pub async fn evict_by_prefix(&self, prefix: &str, level: CacheLevel) -> CacheResult<u64> {
        self.remove_prefix(prefix, level, EvictionReason::Invalidated)
            .await
    }

    /// Remove all cached data for one entity:
    /// `evict_by_prefix("<entityType>:<id>")`.
    pub async fn invalidate_entity(
        &self,
        entity_id: impl std::fmt::Display,
        entity_type: &str,
        level: CacheLevel,
    ) -> CacheResult<u64> {
        self.remove_prefix(
            &keys::entity_prefix(entity_type, entity_id),
            level,
            EvictionReason::Invalidated,
        )
        .await
    }

    /// Remove all cached data for an entity type:
    /// `evict_by_prefix("<entityType>:")`.
    pub async fn invalidate_entity_type(
        &self,
        entity_type: &str,
        level: CacheLevel,
    ) -> CacheResult<u64> {
        self.remove_prefix(
            &keys::entity_type_prefix(entity_type),
            level,
            EvictionReason::Invalidated,
        )
        .await
    }

    /// Remove all cached statistics for one ward:
    /// `evict_by_prefix("ward_statistics:<wardId>")`.
    pub async fn invalidate_ward_statistics(
        &self,
        ward_id: WardId,
        level: CacheLevel,
    ) -> CacheResult<u64> {
        self.remove_prefix(
            &keys::ward_statistics_key(ward_id),
            level,
            EvictionReason::Invalidated,
        )
        .await
    }

    /// Empty the targeted tier(s) entirely. Returns the number of tier
    /// entries removed; all of them count toward `evictions`.
    pub async fn clear_all(&self, level: CacheLevel) -> CacheResult<u64> {
        let mut removed = 0u64;
        if level.targets_local() {
            let cleared = self.local.clear();
            removed += cleared.len() as u64;
            for key in &cleared {
                self.notifier.notify_eviction(key, EvictionReason::Clear);
            }
        }
        if level.targets_distributed() {
            removed += self
                .guarded("clear", self.distributed.clear())
                .await
                .unwrap_or(0);
        }
        if removed > 0 {
            self.stats.record_evictions(removed);
        }
        info!(removed, "cache cleared");
        Ok(removed)
    }

    async fn remove_prefix(
        &self,
        prefix: &str,
        level: CacheLevel,
        reason: EvictionReason,
    ) -> CacheResult<u64> {
        Self::validate_key(prefix)?;
        let mut removed = 0u64;
        if level.targets_local() {
            let cleared = self.local.remove_by_prefix(prefix);
            removed += cleared.len() as u64;
            for key in &cleared {
                self.notifier.notify_eviction(key, reason);
            }
        }
        if level.targets_distributed() {
            removed += self
                .guarded("delete_by_prefix", self.distributed.delete_by_prefix(prefix))
                .await
                .unwrap_or(0);
        }
        if removed > 0 {
            self.stats.record_evictions(removed);
        }
        debug!(prefix, removed, "cache prefix eviction");
        Ok(removed)
    }

    // ========================================================================
    // OBSERVABILITY
    // ========================================================================

    /// Current counters, hit ratio, tier sizes, and local composition by
    /// region. Counters are process-lifetime and never reset.
    pub async fn statistics(&self) -> CacheStatsSnapshot {
        let local_keys = self.local.keys();
        let local_regions = self.regions.composition(local_keys.iter());
        let distributed_entries = self.guarded("len", self.distributed.len()).await;
        self.stats
            .snapshot(local_keys.len() as u64, distributed_entries, local_regions)
    }

    /// Add a listener to the notification list. Listener panics are
    /// caught and logged, never propagated to the caller that triggered
    /// the event.
    pub fn register_cache_event_listener(&self, listener: Arc<dyn CacheEventListener>) {
        self.notifier.register(listener);
    }

    /// Probe both tiers. Returns `true` when both respond; a distributed
    /// failure yields `false` but the cache keeps serving local reads,
    /// degraded.
    pub async fn health_check(&self) -> bool {
        let distributed_ok = self.guarded("ping", self.distributed.ping()).await.is_some();
        if !distributed_ok {
            warn!("distributed tier unavailable, serving local tier only");
        }
        distributed_ok
    }
}

impl<D: DistributedStore> std::fmt::Debug for CacheManager<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("local_entries", &self.local.len())
            .field("listeners", &self.notifier.len())
            .finish()
    }
}
