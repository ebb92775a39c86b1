//! On-disk response cache.
//!
//! Reference data (services, stops, line patterns) lives under one root and
//! expires after a configurable number of days. Timetables and tracking
//! history live under an archive root; history for a finished day never
//! changes, so it never expires.

mod key;
mod read_through;
mod store;

use std::time::Duration;

pub use key::{CacheKey, ResourceKind, Root};
pub use read_through::{DecodeError, ReadThroughCache, json};
pub use store::CacheStore;

/// Whether and for how long an entry may be served from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Read and write the cache at all.
    pub enabled: bool,
    /// `None` never expires.
    pub max_age: Option<Duration>,
}

impl CachePolicy {
    pub fn expiring(enabled: bool, max_age: Duration) -> Self {
        Self {
            enabled,
            max_age: Some(max_age),
        }
    }

    pub fn permanent(enabled: bool) -> Self {
        Self {
            enabled,
            max_age: None,
        }
    }

    /// Neither read nor write.
    pub fn bypass() -> Self {
        Self::permanent(false)
    }

    pub fn is_expired(&self, age: Duration) -> bool {
        self.max_age.is_some_and(|max| age > max)
    }
}
