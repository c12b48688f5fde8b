//! Hit/miss instrumentation.
//!
//! Four process-lifetime counters updated with relaxed atomics - cheap
//! enough to sit on every read path, and never reset automatically.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters shared by all cache operations.
#[derive(Debug, Default)]
pub struct StatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    puts: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Materialize the counters plus tier occupancy into a snapshot.
    pub fn snapshot(
        &self,
        local_entries: u64,
        distributed_entries: Option<u64>,
        local_regions: BTreeMap<String, u64>,
    ) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            hit_ratio: hit_ratio(hits, misses),
            local_entries,
            distributed_entries,
            local_regions,
        }
    }
}

/// `hits / (hits + misses)`, defined as 0.0 before any read.
fn hit_ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Point-in-time view of the cache's counters and occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub puts: u64,
    pub hit_ratio: f64,
    pub local_entries: u64,
    /// `None` when the distributed tier could not report in time.
    pub distributed_entries: Option<u64>,
    /// Local entry counts grouped by region.
    pub local_regions: BTreeMap<String, u64>,
}
