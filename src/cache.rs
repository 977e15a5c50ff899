//! In-memory expiring cache.
//!
//! Thread-safe TTL cache used to memoize completed analyses. Backed by
//! DashMap for concurrent access without lock contention. Eviction is lazy:
//! an expired entry occupies memory until the next access, `cleanup_expired`,
//! or `clear`, but is never returned once past its expiry.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default TTL: 5 minutes
const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }

    fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Generic string-keyed value store with per-entry absolute expiry
#[derive(Clone)]
pub struct TtlCache<V: Clone> {
    store: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Store a value with expiry = now + ttl, overwriting any existing entry
    pub fn set(&self, key: &str, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.store.insert(key.to_string(), entry);
        debug!("💾 CACHE SET: {} (TTL: {}s)", key, self.ttl.as_secs());
    }

    /// Return the value if present and not expired. Expired entries are
    /// evicted on access and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.store.get(key) {
            Some(entry) if entry.is_expired() => {
                drop(entry); // release the shard read lock before removal
                self.store.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired): {}", key);
                None
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("✅ CACHE HIT: {} ({}s remaining)", key, entry.remaining().as_secs());
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS: {}", key);
                None
            }
        }
    }

    /// Whether a live entry exists, without cloning the value
    pub fn has(&self, key: &str) -> bool {
        match self.store.get(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    /// Remove all entries unconditionally
    pub fn clear(&self) {
        self.store.clear();
        info!("🗑️ CACHE CLEARED");
    }

    /// Sweep expired entries, returning the count removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before - self.store.len();
        if removed > 0 {
            info!("🧹 CACHE CLEANUP: {} expired entries removed", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        cache.set("0xabc", "report".to_string());
        assert_eq!(cache.get("0xabc"), Some("report".to_string()));
        assert!(cache.has("0xabc"));
    }

    #[test]
    fn test_overwrite() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 1);
        cache.set("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss() {
        let cache: TtlCache<u32> = TtlCache::default();
        assert_eq!(cache.get("missing"), None);
        assert!(!cache.has("missing"));
    }

    #[test]
    fn test_expiry() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(50));
        cache.set("k", 7);
        assert_eq!(cache.get("k"), Some(7));
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_clear_and_cleanup() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(10));
        cache.set("a", 1);
        cache.set("b", 2);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.cleanup_expired(), 2);
        assert!(cache.is_empty());

        cache.set("c", 3);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 1);
        cache.get("k"); // hit
        cache.get("nope"); // miss
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
