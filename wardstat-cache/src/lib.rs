//! Tiered cache for ward-level statistical aggregates.
//!
//! This crate provides a two-tier cache manager that sits in front of
//! expensive aggregations: a fast process-local tier backed by a
//! distributed tier shared across instances.
//!
//! # Design Philosophy
//!
//! The cache is a best-effort performance layer, never a system of
//! record. Infrastructure failures fail open - an unreachable distributed
//! store degrades hit rate, not correctness - while a broken value
//! producer surfaces to the caller, because hiding it would mean silently
//! serving nothing where data is expected.
//!
//! # Architecture
//!
//! ```text
//! Caller → CacheManager → Local tier (in-process, per-entry TTL)
//!                       → Distributed tier (Redis, shared)
//!                         ↓ hit under CacheLevel::All
//!                         warm local copy with a bounded TTL
//! ```
//!
//! - [`CacheManager`] - the façade all callers go through
//! - [`LocalCache`] - lock-guarded in-process tier with lazy expiry
//! - [`DistributedStore`] - contract for the shared tier, implemented by
//!   [`RedisStore`] in production and [`InMemoryStore`] for tests
//! - [`RegionResolver`] - key-prefix grouping for metrics only
//! - [`StatsCollector`] / [`CacheStatsSnapshot`] - hit/miss accounting
//! - [`EventNotifier`] - listener broadcast with per-listener isolation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wardstat_cache::{CacheManager, RedisStore};
//! use wardstat_core::{CacheConfig, CacheLevel};
//!
//! let config = CacheConfig::default().with_namespace("stats");
//! let store = RedisStore::from_config(&config).await?;
//! let cache = CacheManager::new(Arc::new(store), config);
//!
//! cache.put("ward_statistics:7:1", &summary, Duration::from_secs(3600), CacheLevel::All).await?;
//! ```

pub mod distributed;
pub mod entry;
pub mod events;
pub mod local;
pub mod manager;
pub mod region;
pub mod stats;
pub mod traits;

pub use distributed::{InMemoryStore, RedisStore};
pub use entry::CacheEntry;
pub use events::EventNotifier;
pub use local::LocalCache;
pub use manager::CacheManager;
pub use region::RegionResolver;
pub use stats::{CacheStatsSnapshot, StatsCollector};
pub use traits::{Cacheable, CacheEventListener, DistributedStore};

// Re-export core types for convenience
pub use wardstat_core::{
    CacheConfig, CacheError, CacheLevel, CacheResult, EvictionReason, RegionMapping,
};
