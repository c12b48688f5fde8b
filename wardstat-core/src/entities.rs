//! Domain DTOs for ward-level demographic aggregates.
//!
//! These are the payloads services typically cache. They carry their own
//! `cached_at` bookkeeping so the cache layer can record when a copy was
//! last stored; the cacheability contract itself lives in the cache crate.

use serde::{Deserialize, Serialize};

use crate::{Timestamp, WardId};

/// One bucket of an age distribution, e.g. `"25-34" -> 4_102`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub label: String,
    pub count: u64,
}

/// Precomputed demographic summary for a single ward.
///
/// Produced by an expensive aggregation over the source records; the cache
/// exists to amortize that cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardDemographicSummary {
    pub ward_id: WardId,
    pub ward_name: String,
    pub population_total: u64,
    pub households: u64,
    pub median_age: f64,
    pub age_bands: Vec<AgeBand>,
    /// When the aggregation ran.
    pub computed_at: Timestamp,
    /// When this copy was last stored in the cache, if ever.
    pub cached_at: Option<Timestamp>,
}

impl WardDemographicSummary {
    /// Version component used in this summary's cache key. Bump when the
    /// serialized shape changes incompatibly.
    pub const CACHE_VERSION: u32 = 1;
}

/// A single-dimension breakdown (ethnicity, tenure, ...) for one ward.
///
/// Deliberately unrelated to [`WardDemographicSummary`] - cacheability is a
/// capability, not a base class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicBreakdown {
    pub ward_id: WardId,
    /// Which dimension this breakdown slices by, e.g. `"tenure"`.
    pub dimension: String,
    pub buckets: Vec<(String, u64)>,
    pub computed_at: Timestamp,
    pub cached_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_summary_roundtrips_through_json() {
        let summary = WardDemographicSummary {
            ward_id: 7,
            ward_name: "Riverside".to_string(),
            population_total: 18_240,
            households: 7_411,
            median_age: 36.4,
            age_bands: vec![AgeBand {
                label: "25-34".to_string(),
                count: 4_102,
            }],
            computed_at: Utc::now(),
            cached_at: None,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: WardDemographicSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
