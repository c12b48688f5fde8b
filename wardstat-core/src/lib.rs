//! Wardstat Core - Data Types
//!
//! Pure data structures with no behavior. The cache crate and any service
//! embedding it depend on this. This crate contains ONLY data types,
//! configuration, and small helpers - no cache logic.

use serde::{Deserialize, Serialize};

pub mod clock;
pub mod config;
pub mod entities;
pub mod error;
pub mod keys;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, RegionMapping};
pub use entities::{AgeBand, DemographicBreakdown, WardDemographicSummary};
pub use error::{CacheError, CacheResult};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Cache keys are opaque strings. Only prefix matching is guaranteed;
/// see [`keys`] for the conventional constructors.
pub type CacheKey = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Ward identifier as assigned by the upstream statistics system.
pub type WardId = i64;

// ============================================================================
// ENUMS
// ============================================================================

/// Which storage tier(s) a cache operation targets.
///
/// Passed per call and never persisted. Typical use is [`CacheLevel::All`]:
/// reads check the local tier first and fall back to the distributed tier,
/// writes go to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CacheLevel {
    /// Process-local tier only.
    Local,
    /// Shared distributed tier only.
    Distributed,
    /// Both tiers.
    #[default]
    All,
}

impl CacheLevel {
    /// Whether this level includes the local tier.
    pub fn targets_local(&self) -> bool {
        matches!(self, CacheLevel::Local | CacheLevel::All)
    }

    /// Whether this level includes the distributed tier.
    pub fn targets_distributed(&self) -> bool {
        matches!(self, CacheLevel::Distributed | CacheLevel::All)
    }
}

/// Why an entry left the cache, reported to eviction listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvictionReason {
    /// A caller evicted the key directly.
    Explicit,
    /// The entry's TTL elapsed and a read discovered it.
    Expired,
    /// Removed by a prefix or entity invalidation.
    Invalidated,
    /// Removed by a full clear of the tier.
    Clear,
    /// Displaced to keep the local tier under its configured bound.
    Capacity,
}

impl EvictionReason {
    /// Stable lowercase name, used in log fields and listener payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Explicit => "explicit",
            EvictionReason::Expired => "expired",
            EvictionReason::Invalidated => "invalidated",
            EvictionReason::Clear => "clear",
            EvictionReason::Capacity => "capacity",
        }
    }
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
