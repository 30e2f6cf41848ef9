use std::num::NonZeroUsize;

use lru::LruCache;

/// LRU cache of normalized query vectors, keyed by the raw question text.
///
/// A capacity of zero disables caching entirely.
pub struct QueryCache {
    cache: Option<LruCache<String, Vec<f32>>>,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, query: &str) -> Option<Vec<f32>> {
        let hit = self.cache.as_mut().and_then(|c| c.get(query).cloned());
        if hit.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        hit
    }

    pub fn put(&mut self, query: &str, vector: Vec<f32>) {
        if let Some(cache) = self.cache.as_mut() {
            cache.put(query.to_string(), vector);
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
