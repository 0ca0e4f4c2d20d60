//! LRU cache of parsed watershed layers keyed by file content.
//!
//! A long-running caller that is handed the same boundary file repeatedly
//! skips the GeoJSON parse after the first time.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ZonalConfig;
use crate::error::Result;
use crate::types::CacheStats;
use crate::watershed::WatershedLayer;

/// Hex SHA-256 digest of a watershed file's bytes.
pub fn content_key(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// LRU cache of parsed layers.
pub struct WatershedCache {
    cache: LruCache<String, Arc<WatershedLayer>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl WatershedCache {
    /// Create a cache holding at most `capacity` layers (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cache sized by `watershed_cache_capacity`.
    pub fn from_config(config: &ZonalConfig) -> Self {
        Self::new(config.watershed_cache_capacity)
    }

    /// Try to get a layer from the cache.
    pub fn get(&mut self, key: &str) -> Option<Arc<WatershedLayer>> {
        if let Some(layer) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(layer))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Check if a key exists in the cache without updating LRU order.
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    pub fn insert(&mut self, key: String, layer: Arc<WatershedLayer>) {
        if let Some((evicted, _)) = self.cache.push(key.clone(), layer) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Return the cached layer for `bytes`, parsing and caching it on a miss.
    /// Parse failures are not cached.
    pub fn get_or_load(&mut self, bytes: &[u8]) -> Result<Arc<WatershedLayer>> {
        let key = content_key(bytes);
        if let Some(layer) = self.get(&key) {
            return Ok(layer);
        }

        let layer = Arc::new(WatershedLayer::from_geojson(bytes)?);
        self.insert(key, Arc::clone(&layer));
        Ok(layer)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
