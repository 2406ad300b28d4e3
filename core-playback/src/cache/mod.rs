//! # Source Cache Module
//!
//! Bounded memory of resolved stream URLs keyed by content reference.
//!
//! ## Overview
//!
//! Resolving a content reference costs a backend round trip, and the same
//! track is resolved again whenever the user navigates back to it or the
//! prefetcher asked for it ahead of time. The cache keeps the most recently
//! used URLs:
//! - LRU eviction once `capacity` entries are stored
//! - Optional TTL, since backend URLs are signed and expire
//! - Only successful resolutions are ever stored
//!
//! The cache is owned by the resolver worker and is not shared, so it needs
//! no locking.

mod config;
mod stats;

pub use config::CacheConfig;
pub use stats::CacheStats;

use crate::models::ContentRef;
use bridge_traits::Clock;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace};

/// A cached resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub resolved_at: DateTime<Utc>,
}

/// LRU cache of resolved source URLs.
pub struct SourceCache {
    entries: LruCache<ContentRef, CacheEntry>,
    ttl: Option<chrono::Duration>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl SourceCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let ttl = config
            .ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok());

        Self {
            entries: LruCache::new(capacity),
            ttl,
            clock,
            stats: CacheStats::default(),
        }
    }

    /// Look up a fresh entry, promoting it to most recently used.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, content_ref: &ContentRef) -> Option<CacheEntry> {
        let now = self.clock.now();
        let ttl = self.ttl;

        let expired = match self.entries.get(content_ref) {
            Some(entry) if !Self::is_expired(ttl, entry, now) => {
                self.stats.hits += 1;
                trace!(content_ref = %content_ref, "Source cache hit");
                return Some(entry.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.pop(content_ref);
            self.stats.expired += 1;
            debug!(content_ref = %content_ref, "Dropped expired source");
        }

        self.stats.misses += 1;
        None
    }

    /// Whether a fresh entry exists. Does not touch recency or counters.
    pub fn contains_fresh(&self, content_ref: &ContentRef) -> bool {
        let now = self.clock.now();
        self.entries
            .peek(content_ref)
            .map_or(false, |entry| !Self::is_expired(self.ttl, entry, now))
    }

    /// Store a successful resolution.
    pub fn insert(&mut self, content_ref: ContentRef, url: String) -> CacheEntry {
        let entry = CacheEntry {
            url,
            resolved_at: self.clock.now(),
        };

        let replacing = self.entries.contains(&content_ref);
        if let Some((evicted, _)) = self.entries.push(content_ref, entry.clone()) {
            if !replacing {
                self.stats.evictions += 1;
                debug!(content_ref = %evicted, "Evicted source from cache");
            }
        }

        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    fn is_expired(
        ttl: Option<chrono::Duration>,
        entry: &CacheEntry,
        now: DateTime<Utc>,
    ) -> bool {
        match ttl {
            Some(ttl) => now.signed_duration_since(entry.resolved_at) >= ttl,
            None => false,
        }
    }
}

impl std::fmt::Debug for SourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCache")
            .field("entries", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .field("ttl", &self.ttl)
            .field("stats", &self.stats)
            .finish()
    }
}
