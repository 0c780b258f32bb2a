//! Bounded prediction cache.
//!
//! Keys are the exact ordered feature tuple. Eviction is first-in first-out.
//! A cache belongs to one loaded model and dies with it on reload.

use crate::record::{FeatureRecord, FeatureValue};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Default number of cached predictions.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Number(u64),
    Text(String),
    Null,
}

/// Ordered feature tuple used as a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<KeyPart>);

impl CacheKey {
    /// Key for `record` restricted to `expected`, in that order.
    ///
    /// Absent fields hash like nulls; callers validate before caching.
    pub fn new(record: &FeatureRecord, expected: &[String]) -> Self {
        Self(
            expected
                .iter()
                .map(|name| match record.get(name) {
                    // -0.0 and 0.0 encode identically
                    Some(FeatureValue::Number(n)) => KeyPart::Number((n + 0.0).to_bits()),
                    Some(FeatureValue::Text(s)) => KeyPart::Text(s.clone()),
                    Some(FeatureValue::Null) | None => KeyPart::Null,
                })
                .collect(),
        )
    }
}

/// Hit and size counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed
    pub misses: u64,
    /// Entries currently held
    pub len: usize,
    /// Maximum entries
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, f64>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

/// FIFO cache of predicted prices
#[derive(Debug)]
pub struct PredictionCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PredictionCache {
    /// Cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Cached price for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<f64> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(key).copied();
        match found {
            Some(_) => inner.hits += 1,
            None => inner.misses += 1,
        }
        found
    }

    /// Store a price, evicting the oldest entry when full.
    pub fn insert(&self, key: CacheKey, price: f64) {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(&key) {
            inner.entries.insert(key, price);
            return;
        }
        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, price);
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.entries.len(),
            capacity: self.capacity,
        }
    }
}
