//! Region resolution for metrics segregation.
//!
//! A region is a grouping label derived from a key prefix - never a
//! correctness boundary. Operators use it to reason about cache
//! composition by domain area ("ward" vs "demographic" entries).

use std::collections::BTreeMap;

use wardstat_core::{CacheConfig, RegionMapping};

/// Maps cache keys to logical region names by prefix, first match wins.
#[derive(Debug, Clone)]
pub struct RegionResolver {
    mappings: Vec<RegionMapping>,
    default_region: String,
}

impl RegionResolver {
    /// Build a resolver from an explicit table and fallback.
    pub fn new(mappings: Vec<RegionMapping>, default_region: impl Into<String>) -> Self {
        Self {
            mappings,
            default_region: default_region.into(),
        }
    }

    /// Build a resolver from the cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.regions.clone(), config.default_region.clone())
    }

    /// Resolve a key to its region. Keys matching no prefix fall back to
    /// the default region.
    pub fn resolve(&self, key: &str) -> &str {
        self.mappings
            .iter()
            .find(|m| key.starts_with(&m.prefix))
            .map(|m| m.region.as_str())
            .unwrap_or(&self.default_region)
    }

    /// Count keys per region.
    pub fn composition<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for key in keys {
            *counts.entry(self.resolve(key).to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> RegionResolver {
        RegionResolver::new(
            vec![
                RegionMapping::new("ward_statistics", "ward"),
                RegionMapping::new("ward", "ward-misc"),
                RegionMapping::new("demographic", "demographic"),
            ],
            "general",
        )
    }

    #[test]
    fn test_first_match_wins() {
        let r = resolver();
        // "ward_statistics:1" matches both "ward_statistics" and "ward";
        // table order decides.
        assert_eq!(r.resolve("ward_statistics:1"), "ward");
        assert_eq!(r.resolve("ward_boundary:1"), "ward-misc");
        assert_eq!(r.resolve("demographic:tenure:3"), "demographic");
    }

    #[test]
    fn test_unknown_prefix_falls_back() {
        assert_eq!(resolver().resolve("geometry:12"), "general");
    }

    #[test]
    fn test_composition_counts() {
        let r = resolver();
        let keys = vec![
            "ward_statistics:1".to_string(),
            "ward_statistics:2".to_string(),
            "demographic:tenure:1".to_string(),
            "other".to_string(),
        ];
        let composition = r.composition(keys.iter());
        assert_eq!(composition.get("ward"), Some(&2));
        assert_eq!(composition.get("demographic"), Some(&1));
        assert_eq!(composition.get("general"), Some(&1));
    }
}
