//! Cache engine — a bounded key/value store with per-entry TTL.
//!
//! Expiry is lazy: an entry is only checked when it is accessed, and an
//! expired entry found by `get` is removed and counted as a miss. When the
//! store is full, inserting a new key evicts the least-recently-used entry
//! first, regardless of how much TTL it has left.
//!
//! All state (entries, recency counter, statistics) lives behind one
//! `parking_lot::Mutex`, so a lookup can never observe a half-evicted entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use parley_config::CacheConfig;
use serde::Serialize;
use tracing::trace;

/// A stored value together with its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    /// Insertion instant.
    pub timestamp: Instant,
    pub ttl: Duration,
    last_access: u64,
}

impl<V> CacheEntry<V> {
    fn new(data: V, ttl: Duration, access: u64) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
            ttl,
            last_access: access,
        }
    }

    /// True iff more than `ttl` has passed since insertion.
    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_requests: u64,
    /// `cache_hits / total_requests`, or 0 before the first request.
    pub hit_rate: f64,
    pub entries: usize,
    pub max_size: usize,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    access_counter: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn touch(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    fn evict_lru(&mut self) {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone());
        if let Some(key) = lru_key {
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }
}

/// Process-wide TTL + LRU cache. Share it behind an `Arc`.
#[derive(Debug)]
pub struct CacheEngine<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> CacheEngine<K, V> {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(max_size.min(1024)),
                access_counter: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            max_size,
            default_ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_size, config.default_ttl())
    }

    /// Insert or replace a value. `None` uses the default TTL.
    ///
    /// Returns `false` only when the cache has no capacity at all.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) -> bool {
        if self.max_size == 0 {
            return false;
        }
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut inner = self.inner.lock();
        let access = inner.touch();

        if !inner.entries.contains_key(&key) {
            while inner.entries.len() >= self.max_size {
                inner.evict_lru();
                trace!("cache at capacity, evicted least-recently-used entry");
            }
        }
        inner.entries.insert(key, CacheEntry::new(value, ttl, access));
        true
    }

    /// Look up a value, treating expired entries as misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let access = inner.touch();

        let expired = match inner.entries.get_mut(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) if entry.is_expired() => true,
            Some(entry) => {
                entry.last_access = access;
                false
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.expirations += 1;
            inner.misses += 1;
            return None;
        }

        inner.hits += 1;
        inner.entries.get(key).map(|e| e.data.clone())
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Presence check that leaves statistics and recency untouched.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .lock()
            .entries
            .get(key)
            .is_some_and(|e| !e.is_expired())
    }

    pub fn get_stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total_requests = inner.hits + inner.misses;
        let hit_rate = if total_requests == 0 {
            0.0
        } else {
            inner.hits as f64 / total_requests as f64
        };
        CacheStats {
            cache_hits: inner.hits,
            cache_misses: inner.misses,
            total_requests,
            hit_rate,
            entries: inner.entries.len(),
            max_size: self.max_size,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }

    /// Drop every expired entry now. Returns how many were removed.
    ///
    /// Only reclaims memory; `get` already ignores expired entries.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.is_expired());
        let removed = before - inner.entries.len();
        inner.expirations += removed as u64;
        removed
    }

    /// Remove all entries. Counters are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet accessed.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
