//! Bounded query-embedding cache.
//!
//! Repeated and paginated searches embed the same normalized query over and
//! over; this LRU memoises those vectors. Entries are keyed on the normalized
//! query string only, not on the vocabulary that produced it. An optional TTL
//! bounds how long a stale entry can survive a vocabulary change; the index
//! manager can also clear the cache on every rebuild.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

/// Default number of cached queries
pub const DEFAULT_QUERY_CACHE_SIZE: usize = 256;

#[derive(Debug, Clone)]
struct CachedEmbedding {
    embedding: Vec<f32>,
    cached_at: Instant,
}

/// Cache statistics for monitoring and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

impl CacheStats {
    /// Calculate hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.hits as f64 / total as f64;
            rate
        }
    }
}

/// LRU map from normalized query to its embedding.
///
/// Not synchronized; the index manager keeps it behind its state lock.
#[derive(Debug)]
pub struct QueryEmbeddingCache {
    entries: LruCache<String, CachedEmbedding>,
    ttl: Option<Duration>,
    stats: CacheStats,
}

impl Default for QueryEmbeddingCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_CACHE_SIZE, None)
    }
}

impl QueryEmbeddingCache {
    /// Capacity 0 is treated as 1.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Cached embedding for a query, if present and not expired.
    pub fn get(&mut self, query: &str) -> Option<Vec<f32>> {
        let ttl = self.ttl;
        let expired = match self.entries.get(query) {
            Some(entry) => ttl.is_some_and(|ttl| entry.cached_at.elapsed() > ttl),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.pop(query);
            self.stats.expired += 1;
            self.stats.misses += 1;
            return None;
        }

        self.stats.hits += 1;
        self.entries.get(query).map(|entry| entry.embedding.clone())
    }

    pub fn put(&mut self, query: impl Into<String>, embedding: Vec<f32>) {
        self.entries.put(
            query.into(),
            CachedEmbedding {
                embedding,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
