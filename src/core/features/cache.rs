// src/core/features/cache.rs
//
// Typed memoization for extraction results. Entries are keyed by the
// identity of the component that produced them plus a fingerprint of the
// data it consumed. Concurrent misses on the same key may both compute;
// the last insert wins.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::signal::{Feature, FeatureGram, Fingerprint};
use crate::error::Result;

/// Component identity plus data fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub component: String,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(component: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            component: component.into(),
            fingerprint,
        }
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Concurrent map that is only ever cleared explicitly
#[derive(Debug)]
pub struct FeatureCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> Default for FeatureCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<K: Eq + Hash, V: Clone> FeatureCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.entries.read().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.write().insert(key, value);
    }

    /// Return the cached value or compute and store it.
    ///
    /// The lock is not held while `compute` runs.
    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Caches used by the feature-gram pipeline: raw sub-window features per
/// (extractor, segmentation) and processed grams per descriptor.
#[derive(Debug, Default)]
pub struct FeatureGramCache {
    pub(crate) unprocessed: FeatureCache<CacheKey, Arc<Vec<Feature>>>,
    pub(crate) processed: FeatureCache<CacheKey, Arc<FeatureGram>>,
}

static GLOBAL_CACHE: Lazy<Arc<FeatureGramCache>> = Lazy::new(|| Arc::new(FeatureGramCache::new()));
static GLOBAL_CACHE_ENABLED: AtomicBool = AtomicBool::new(false);

impl FeatureGramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance consulted by pipelines built with `FeatureGramPipeline::new`
    pub fn global() -> Arc<FeatureGramCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    pub fn set_global_enabled(enabled: bool) {
        GLOBAL_CACHE_ENABLED.store(enabled, Ordering::Relaxed);
    }

    pub fn global_enabled() -> bool {
        GLOBAL_CACHE_ENABLED.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.unprocessed.clear();
        self.processed.clear();
    }

    pub fn len(&self) -> usize {
        self.unprocessed.len() + self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn processed_stats(&self) -> CacheStats {
        self.processed.stats()
    }

    pub fn unprocessed_stats(&self) -> CacheStats {
        self.unprocessed.stats()
    }
}
