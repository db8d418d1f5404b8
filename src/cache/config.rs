//! Cache configuration derived from the `[cache]` settings table.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_HOME_TTL_SECONDS: u64 = 20;
const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Serve the home timeline from the cache.
    pub enabled: bool,
    /// Lifetime of a cached home page.
    pub home_ttl: Duration,
    /// Maximum number of cached pages (one per page number).
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            home_ttl: Duration::from_secs(DEFAULT_HOME_TTL_SECONDS),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            home_ttl: Duration::from_secs(settings.home_ttl_seconds),
            capacity: settings.capacity.get(),
        }
    }
}

impl CacheConfig {
    /// Capacity as `NonZeroUsize`, clamping zero to one.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
