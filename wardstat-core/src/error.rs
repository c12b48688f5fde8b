//! Error types for cache operations

use std::time::Duration;
use thiserror::Error;

/// Cache layer errors.
///
/// Most distributed-tier failures never reach callers: the manager catches
/// them at its boundary and degrades to a miss or no-op. The variants here
/// surface only for invalid input, caller-side serialization problems, and
/// a failed `refresh` with no usable local fallback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache key must not be empty")]
    EmptyKey,

    #[error("Serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Distributed backend error: {reason}")]
    Backend { reason: String },

    #[error("Distributed operation {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Refresh failed for key {key} with no valid cached fallback: {reason}")]
    RefreshFailed { key: String, reason: String },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    /// Construct a serialization error from any displayable cause.
    pub fn serialization(key: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        CacheError::Serialization {
            key: key.into(),
            reason: cause.to_string(),
        }
    }

    /// Construct a backend error from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        CacheError::Backend {
            reason: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CacheError::EmptyKey.to_string(),
            "Cache key must not be empty"
        );
        let err = CacheError::serialization("ward_statistics:7", "not a number");
        assert!(err.to_string().contains("ward_statistics:7"));
    }
}
