//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single region mapping: keys starting with `prefix` belong to `region`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMapping {
    pub prefix: String,
    pub region: String,
}

impl RegionMapping {
    pub fn new(prefix: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            region: region.into(),
        }
    }
}

/// Configuration for the tiered cache.
///
/// All fields have working defaults; the builder methods override them
/// individually. The struct is serde-deserializable so services can load
/// it from their own configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied to local puts when the caller does not specify one.
    pub default_local_ttl: Duration,

    /// TTL applied to distributed puts when the caller does not specify one.
    pub default_distributed_ttl: Duration,

    /// TTL for entries opportunistically copied into the local tier after a
    /// distributed hit. Bounded and independent of the original TTL, which
    /// is not reliably recoverable from the distributed store.
    pub warming_ttl: Duration,

    /// Prefix-to-region table, first match wins.
    pub regions: Vec<RegionMapping>,

    /// Region reported for keys that match no prefix.
    pub default_region: String,

    /// Connection string for the distributed backend.
    pub redis_url: String,

    /// Key namespace the distributed backend stores under. Keeps cache
    /// traffic separable from other users of the same backend.
    pub namespace: String,

    /// Upper bound on any single distributed operation. On expiry the
    /// operation is treated like any other backend failure (fail-open).
    pub operation_timeout: Duration,

    /// Optional bound on local tier entry count. `None` leaves the tier
    /// unbounded.
    pub max_local_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_local_ttl: Duration::from_secs(300),
            default_distributed_ttl: Duration::from_secs(1800),
            warming_ttl: Duration::from_secs(60),
            regions: vec![
                RegionMapping::new("ward_statistics", "ward"),
                RegionMapping::new("ward", "ward"),
                RegionMapping::new("demographic", "demographic"),
            ],
            default_region: "general".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            namespace: "wardstat".to_string(),
            operation_timeout: Duration::from_millis(500),
            max_local_entries: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default local TTL.
    pub fn with_local_ttl(mut self, ttl: Duration) -> Self {
        self.default_local_ttl = ttl;
        self
    }

    /// Set the default distributed TTL.
    pub fn with_distributed_ttl(mut self, ttl: Duration) -> Self {
        self.default_distributed_ttl = ttl;
        self
    }

    /// Set the warming TTL used after distributed hits.
    pub fn with_warming_ttl(mut self, ttl: Duration) -> Self {
        self.warming_ttl = ttl;
        self
    }

    /// Replace the region mapping table.
    pub fn with_regions(mut self, regions: Vec<RegionMapping>) -> Self {
        self.regions = regions;
        self
    }

    /// Set the fallback region name.
    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    /// Set the distributed backend connection string.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    /// Set the distributed key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the distributed operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Bound the local tier to at most `max` entries.
    pub fn with_max_local_entries(mut self, max: usize) -> Self {
        self.max_local_entries = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_local_ttl(Duration::from_secs(120))
            .with_distributed_ttl(Duration::from_secs(3600))
            .with_warming_ttl(Duration::from_secs(30))
            .with_default_region("misc")
            .with_redis_url("redis://cache.internal:6379")
            .with_namespace("stats")
            .with_operation_timeout(Duration::from_millis(250))
            .with_max_local_entries(5_000);

        assert_eq!(config.default_local_ttl, Duration::from_secs(120));
        assert_eq!(config.default_distributed_ttl, Duration::from_secs(3600));
        assert_eq!(config.warming_ttl, Duration::from_secs(30));
        assert_eq!(config.default_region, "misc");
        assert_eq!(config.redis_url, "redis://cache.internal:6379");
        assert_eq!(config.namespace, "stats");
        assert_eq!(config.operation_timeout, Duration::from_millis(250));
        assert_eq!(config.max_local_entries, Some(5_000));
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = CacheConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
