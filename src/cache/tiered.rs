//! # Tiered Result Cache
//!
//! Stores previously computed enhancements keyed by point name. Each entry
//! carries the tier and TTL fixed from the confidence that produced it, so a
//! low-confidence result is never trusted for longer than its tier allows.
//!
//! Expired entries are evicted lazily on lookup, not proactively; there is no
//! sweeper task to coordinate with.
//!
//! # Thread Safety
//! One read-mostly RwLock guards the whole map, which also serializes
//! per-key set/get pairs: two concurrent writers for the same key cannot
//! interleave into a torn entry.

use crate::cache::types::{CacheEntry, CacheProbe, CacheStats, CacheTier};
use crate::types::{now_ms, Enhancement};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// In-process enhancement cache with confidence-dependent expiration.
pub struct TieredCache {
    inner: RwLock<CacheInner>,
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("TieredCache")
            .field("entries", &inner.entries.len())
            .field("hits", &inner.hits)
            .field("misses", &inner.misses)
            .finish()
    }
}

impl TieredCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        TieredCache {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    // ============================================================================================
    // WRITE PATH
    // ============================================================================================

    /// Store an enhancement at the given confidence, overwriting any prior
    /// entry for the key. Tier and TTL are derived here and never change.
    pub fn set(&self, key: impl Into<String>, data: Enhancement, confidence: u8) {
        let key = key.into();
        let entry = CacheEntry::new(data, confidence);
        debug!(
            "cache set: key={} tier={:?} ttl={}s confidence={}",
            key, entry.tier, entry.ttl_secs, confidence
        );
        self.inner.write().entries.insert(key, entry);
    }

    /// Re-insert an entry preserving its original creation time and counters.
    ///
    /// Used when loading from a persistent backing; a restored entry expires
    /// on its original schedule, not the restore time.
    pub fn restore(&self, key: impl Into<String>, entry: CacheEntry) {
        self.inner.write().entries.insert(key.into(), entry);
    }

    // ============================================================================================
    // READ PATH
    // ============================================================================================

    /// Look up a live entry, counting a hit or a miss.
    ///
    /// An expired entry is evicted here and counted as a miss.
    pub fn get(&self, key: &str) -> Option<Enhancement> {
        let now = now_ms();
        let mut inner = self.inner.write();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.misses += 1;
            return None;
        }

        let data = inner.entries.get_mut(key).map(|entry| {
            entry.hit_count += 1;
            entry.data.clone()
        });
        inner.hits += 1;
        data
    }

    /// Liveness check without touching any counter.
    pub fn has(&self, key: &str) -> bool {
        self.probe(key).is_some()
    }

    /// Non-mutating view of a live entry's tier and recorded confidence.
    ///
    /// This is what the tier selector reads; unlike `get` it neither counts
    /// nor evicts, so routing decisions do not skew hit-rate statistics.
    pub fn probe(&self, key: &str) -> Option<CacheProbe> {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| CacheProbe {
                tier: entry.tier,
                confidence: entry.confidence,
            })
    }

    /// Copy of a live entry, e.g. for persistence or inspection.
    pub fn peek_entry(&self, key: &str) -> Option<CacheEntry> {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    /// All live entries, for handing to a persistent backing.
    pub fn live_entries(&self) -> Vec<(String, CacheEntry)> {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    // ============================================================================================
    // INVALIDATION
    // ============================================================================================

    /// Remove one entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.write().entries.remove(key).is_some()
    }

    /// Remove every entry in a tier. Returns how many were removed.
    pub fn invalidate_by_tier(&self, tier: CacheTier) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.tier != tier);
        before - inner.entries.len()
    }

    /// Remove everything and reset the hit/miss counters.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    // ============================================================================================
    // STATISTICS
    // ============================================================================================

    /// Aggregate statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        let lookups = inner.hits + inner.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            inner.hits as f64 / lookups as f64 * 100.0
        };

        CacheStats {
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }
}
