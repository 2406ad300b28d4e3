//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Counters kept by the resolved-source cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,

    /// Lookups that found nothing usable (including expired entries)
    pub misses: u64,

    /// Entries pushed out by capacity
    pub evictions: u64,

    /// Entries dropped because their TTL elapsed
    pub expired: u64,

    /// Entries currently stored
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }

        self.hits as f64 / lookups as f64
    }
}
