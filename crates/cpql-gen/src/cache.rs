//! Optional memoization of generated statements.
//!
//! Generation is pure, so repeated derivation of the same input is
//! idempotent and a cache is never required for correctness. Runtime
//! users parsing the same CPQL text repeatedly can avoid the redundant
//! work by keying a [`StatementCache`] on the input text and dialect.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use cpql_core::GeneratedSql;

/// A cached generated statement.
#[derive(Debug, Clone)]
pub struct CachedStatement {
    /// The generated statement.
    pub sql: GeneratedSql,
    /// When this entry was last accessed.
    pub last_used: Instant,
    /// Number of times this statement has been reused.
    pub hit_count: u64,
}

/// LRU-style cache for generated statements.
///
/// Keyed by a `u64` hash that callers compute from their input (see
/// [`cache_key`]). When the cache exceeds `max_size`, the
/// least-recently-used entry is evicted.
#[derive(Debug)]
pub struct StatementCache {
    cache: HashMap<u64, CachedStatement>,
    max_size: usize,
}

impl StatementCache {
    /// Create a new cache with the given maximum number of entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::with_capacity(max_size.min(256)),
            max_size,
        }
    }

    /// Get a cached statement or generate and insert it.
    ///
    /// The `generate` closure is only called on cache miss.
    pub fn get_or_insert(
        &mut self,
        key: u64,
        generate: impl FnOnce() -> GeneratedSql,
    ) -> &GeneratedSql {
        if !self.cache.contains_key(&key) && self.cache.len() >= self.max_size {
            self.evict_lru();
        }

        let entry = self.cache.entry(key).or_insert_with(|| CachedStatement {
            sql: generate(),
            last_used: Instant::now(),
            hit_count: 0,
        });
        entry.last_used = Instant::now();
        entry.hit_count += 1;
        &entry.sql
    }

    /// Check if a statement is cached.
    pub fn contains(&self, key: u64) -> bool {
        self.cache.contains_key(&key)
    }

    /// Number of cached statements.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear all cached statements.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn evict_lru(&mut self) {
        if let Some((&lru_key, _)) = self.cache.iter().min_by_key(|(_, entry)| entry.last_used) {
            self.cache.remove(&lru_key);
        }
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Compute a cache key from any hashable value, typically
/// `(dialect, query_text)`.
pub fn cache_key(value: &impl Hash) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
