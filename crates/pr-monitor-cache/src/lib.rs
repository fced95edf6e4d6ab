//! In-memory cache with per-entry expiry
//!
//! `ExpiringCache` backs both the pull request listings and the action
//! deduplication window of the monitor service. Every entry carries its own
//! deadline; there is no background sweeper, expired entries are dropped
//! lazily when they are read (or explicitly via [`ExpiringCache::purge_expired`]).
//!
//! All operations take `&self` and are individually atomic, so one cache can be
//! shared between concurrent tasks behind an `Arc`.
//!
//! # Example
//!
//! ```
//! use pr_monitor_cache::ExpiringCache;
//!
//! let cache = ExpiringCache::new();
//! cache.set("prs:demo", vec![1, 2, 3], 300);
//! assert_eq!(cache.get("prs:demo"), Some(vec![1, 2, 3]));
//!
//! // A non-positive TTL is an invalidation
//! cache.set("prs:demo", vec![], 0);
//! assert_eq!(cache.get("prs:demo"), None);
//! ```

use log::trace;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A cached value together with its deadline
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` only when the deadline does not fit into an `Instant`
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Hit/miss counters, useful for debug logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads that found nothing or an expired value
    pub misses: u64,
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

/// Key/value store where each entry expires after its own TTL
#[derive(Debug)]
pub struct ExpiringCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ExpiringCache<V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // A panic while holding the lock cannot leave a half-written entry
        // behind, so the map is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key` for `ttl_seconds`
    ///
    /// A TTL of zero or less removes the key instead, so the next `get`
    /// returns `None`. Writing an existing key replaces it (last write wins).
    pub fn set(&self, key: impl Into<String>, value: V, ttl_seconds: i64) {
        self.set_at(key.into(), value, ttl_seconds, Instant::now());
    }

    fn set_at(&self, key: String, value: V, ttl_seconds: i64, now: Instant) {
        let mut inner = self.lock();
        match deadline(now, ttl_seconds) {
            Some(expires_at) => {
                trace!("cache set {} (ttl {}s)", key, ttl_seconds);
                inner.entries.insert(key, CacheEntry { value, expires_at });
            }
            None => {
                trace!("cache set {} with ttl {}s, invalidating", key, ttl_seconds);
                inner.entries.remove(&key);
            }
        }
    }

    /// Remove `key`, returning whether a live entry was dropped
    pub fn invalidate(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Insert `value` only if `key` holds no live entry
    ///
    /// Returns `true` when this call stored the value. Check and insert happen
    /// under one lock, so of several concurrent claims on the same key exactly
    /// one wins until the entry expires or is invalidated.
    pub fn claim(&self, key: impl Into<String>, value: V, ttl_seconds: i64) -> bool {
        self.claim_at(key.into(), value, ttl_seconds, Instant::now())
    }

    fn claim_at(&self, key: String, value: V, ttl_seconds: i64, now: Instant) -> bool {
        let mut inner = self.lock();
        if inner.entries.get(&key).is_some_and(|e| e.is_live(now)) {
            return false;
        }
        match deadline(now, ttl_seconds) {
            Some(expires_at) => {
                inner.entries.insert(key, CacheEntry { value, expires_at });
                true
            }
            None => {
                inner.entries.remove(&key);
                false
            }
        }
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.is_live(now));
        before - inner.entries.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .entries
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether the cache holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit/miss counters
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl<V: Clone> ExpiringCache<V> {
    /// Return a clone of the value under `key` if it has not expired
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut inner = self.lock();
        let live = match inner.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                trace!("cache entry {} expired", key);
                inner.entries.remove(key);
                None
            }
            None => None,
        };
        if live.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        live
    }
}

/// Deadline for a TTL starting at `now`; `None` means "do not store"
fn deadline(now: Instant, ttl_seconds: i64) -> Option<Option<Instant>> {
    let ttl = u64::try_from(ttl_seconds).ok().filter(|secs| *secs > 0)?;
    Some(now.checked_add(Duration::from_secs(ttl)))
}
