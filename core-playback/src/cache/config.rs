//! Cache configuration and policies

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the resolved-source cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of resolved URLs kept (default: 256)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// How long a resolved URL stays usable (default: 6 hours).
    /// `None` keeps entries until they are evicted.
    #[serde(default = "default_ttl")]
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl: default_ttl(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of entries.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set entry lifetime.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("Cache capacity must be greater than 0".to_string());
        }

        if matches!(self.ttl, Some(ttl) if ttl.is_zero()) {
            return Err("Cache TTL must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}

fn default_capacity() -> usize {
    256
}

fn default_ttl() -> Option<Duration> {
    Some(Duration::from_secs(6 * 60 * 60))
}
