//! TTL- and capacity-bounded cache for similarity results
//!
//! One instance per logical cache (processed queries, pair scores,
//! search filters). Reads never refresh an entry's timestamp, so an
//! entry lives at most `ttl` from the moment it was written.
//!
//! Eviction on overflow runs in two steps: expired entries go first, then
//! the oldest 20% (rounded up) by write time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::text::normalize_text;

/// Default time-to-live for cache entries
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of entries per cache
pub const DEFAULT_CAPACITY: usize = 1000;

/// Separator between the two halves of a pair key
const PAIR_SEPARATOR: &str = "\u{1f}";

/// A cached value with its write time (epoch milliseconds)
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub timestamp: i64,
}

/// Hit/miss counters and current size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe key/value cache with TTL expiry and bounded size
pub struct SimilarityCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl_ms: i64,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> SimilarityCache<V> {
    /// Create a cache with an explicit TTL and capacity
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.capacity)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.max(0) as u64)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a key against the current wall clock
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, now_ms())
    }

    /// Look up a key as of `now` (epoch ms)
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get_at(&self, key: &str, now: i64) -> Option<V> {
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value stamped with the current wall clock
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key, value, now_ms());
    }

    /// Store a value stamped with `now` (epoch ms), evicting on overflow
    pub fn set_at(&self, key: impl Into<String>, value: V, now: i64) {
        let mut entries = self.lock();
        entries.insert(key.into(), CacheEntry { value, timestamp: now });

        if entries.len() <= self.capacity {
            return;
        }

        let purged = self.purge_locked(&mut entries, now);
        if entries.len() <= self.capacity {
            debug!("Cache overflow resolved by purging {} expired entries", purged);
            return;
        }

        let evict = entries.len().div_ceil(5);
        let mut by_age: Vec<(i64, String)> = entries
            .iter()
            .map(|(k, e)| (e.timestamp, k.clone()))
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(evict) {
            entries.remove(&key);
        }
        debug!(
            "Cache overflow: purged {} expired, evicted {} oldest, {} remain",
            purged,
            evict,
            entries.len()
        );
    }

    /// Remove every expired entry as of `now`, returning how many went
    pub fn purge_expired_at(&self, now: i64) -> usize {
        let mut entries = self.lock();
        self.purge_locked(&mut entries, now)
    }

    /// Drop all entries and reset counters
    pub fn clear(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: i64) -> bool {
        now.saturating_sub(entry.timestamp) >= self.ttl_ms
    }

    fn purge_locked(&self, entries: &mut HashMap<String, CacheEntry<V>>, now: i64) -> usize {
        let before = entries.len();
        entries.retain(|_, e| now.saturating_sub(e.timestamp) < self.ttl_ms);
        before - entries.len()
    }

    // A panic while holding the lock leaves the map structurally valid,
    // so a poisoned mutex is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for SimilarityCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

/// Order-independent cache key for a pair of texts
///
/// Both sides are normalized and sorted, so `(a, b)` and `(b, a)` map to
/// the same key.
pub fn pair_key(a: &str, b: &str) -> String {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a <= b {
        format!("{a}{PAIR_SEPARATOR}{b}")
    } else {
        format!("{b}{PAIR_SEPARATOR}{a}")
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
