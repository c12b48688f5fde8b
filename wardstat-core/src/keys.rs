//! Conventional cache-key constructors.
//!
//! Keys are opaque strings; nothing in the cache parses them beyond prefix
//! matching. These helpers exist so that producers and invalidators agree
//! on the two conventions in use:
//!
//! - `<entityType>:<entityId>:<version>` for versioned entity payloads
//! - `<region-prefix>_<entityId>` for region-scoped aggregates

use crate::WardId;

/// Key prefix for ward-level statistics aggregates.
pub const WARD_STATISTICS_PREFIX: &str = "ward_statistics";

/// Build a versioned entity key: `<entityType>:<entityId>:<version>`.
pub fn entity_key(entity_type: &str, entity_id: impl std::fmt::Display, version: u32) -> String {
    format!("{entity_type}:{entity_id}:{version}")
}

/// Prefix covering every version of one entity: `<entityType>:<entityId>`.
pub fn entity_prefix(entity_type: &str, entity_id: impl std::fmt::Display) -> String {
    format!("{entity_type}:{entity_id}")
}

/// Prefix covering every entity of a type: `<entityType>:`.
pub fn entity_type_prefix(entity_type: &str) -> String {
    format!("{entity_type}:")
}

/// Key (and invalidation prefix) for one ward's statistics:
/// `ward_statistics:<wardId>`.
pub fn ward_statistics_key(ward_id: WardId) -> String {
    format!("{WARD_STATISTICS_PREFIX}:{ward_id}")
}

/// Build a region-scoped key: `<region-prefix>_<entityId>`.
pub fn region_key(region_prefix: &str, entity_id: impl std::fmt::Display) -> String {
    format!("{region_prefix}_{entity_id}")
}
