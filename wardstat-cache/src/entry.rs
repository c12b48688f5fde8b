//! Cache entry data model.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wardstat_core::Timestamp;

/// A stored value plus its creation and expiration timestamps.
///
/// Entries are owned by the tier that stores them and are destroyed by an
/// expiration check, an explicit eviction, or a tier clear. Visibility is
/// strict: an entry is readable only while `now < expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` after `now`.
    ///
    /// TTLs too large to represent saturate to the far future rather than
    /// wrapping.
    pub fn new(value: Value, ttl: Duration, now: Timestamp) -> Self {
        let delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    /// Whether the entry is no longer visible at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_ttl(&self, now: Timestamp) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}
