//! Process-wide time-bounded LRU cache for LLM call results.
//!
//! Values are stored as canonical JSON so the cache stays agnostic of the
//! domain types above it. Keys are namespaced fingerprints over the canonical
//! JSON of the key tuple. A single lock guards the map; every operation is
//! short and allocation-light, so contention stays negligible.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache namespaces. Fingerprints from different namespaces never collide.
pub const NS_REQUEST_ANALYSIS: &str = "request_analysis";
pub const NS_TEMPLATE_GENERATION: &str = "template_generation";
pub const NS_POLICY_SEARCH: &str = "policy_search";

/// Expired-entry sweep runs every this many inserts.
const SWEEP_INTERVAL: u64 = 100;
/// Eviction headroom below max_items, so eviction is not re-triggered by
/// every subsequent insert. Capped at a tenth of capacity for small caches.
const EVICTION_GRACE: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub inserts: u64,
    pub hit_rate: f64,
}

struct CacheEntry {
    value: Value,
    created_at: Instant,
    last_accessed: Instant,
}

struct CacheInner {
    map: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    inserts: u64,
}

pub struct ResultCache {
    inner: Mutex<CacheInner>,
    max_items: usize,
    ttl: Duration,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_config(1000, Duration::from_secs(3600))
    }

    pub fn with_config(max_items: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                hits: 0,
                misses: 0,
                inserts: 0,
            }),
            max_items,
            ttl,
        }
    }

    /// Namespaced fingerprint: SHA-256 of the canonical key JSON, truncated
    /// to 16 hex chars. serde_json maps are sorted, so key order is stable.
    pub fn fingerprint(prefix: &str, keys: &Value) -> String {
        let canonical = serde_json::to_string(keys).unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{}:{}", prefix, &hex::encode(digest)[..16])
    }

    /// Fetch a live entry, bumping its access time. Expired entries count as
    /// misses and are dropped on the spot.
    pub fn get(&self, prefix: &str, keys: &Value) -> Option<Value> {
        let key = Self::fingerprint(prefix, keys);
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let now = Instant::now();

        match inner.map.get_mut(&key) {
            Some(entry) if now.duration_since(entry.created_at) < self.ttl => {
                entry.last_accessed = now;
                let value = entry.value.clone();
                inner.hits += 1;
                log::debug!("cache hit for {}", prefix);
                Some(value)
            }
            Some(_) => {
                inner.map.remove(&key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                log::debug!("cache miss for {}", prefix);
                None
            }
        }
    }

    /// Insert or replace. Every `SWEEP_INTERVAL` inserts, expired entries are
    /// swept and the map is trimmed back under `max_items` by last access.
    pub fn set(&self, prefix: &str, value: Value, keys: &Value) {
        let key = Self::fingerprint(prefix, keys);
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let now = Instant::now();

        inner.map.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed: now,
            },
        );
        inner.inserts += 1;

        if inner.inserts % SWEEP_INTERVAL == 0 {
            self.sweep(&mut inner, now);
        }
    }

    fn sweep(&self, inner: &mut CacheInner, now: Instant) {
        let ttl = self.ttl;
        inner.map.retain(|_, entry| now.duration_since(entry.created_at) < ttl);

        if inner.map.len() > self.max_items {
            let grace = EVICTION_GRACE.min(self.max_items / 10);
            let target = self.max_items.saturating_sub(grace);
            let mut by_access: Vec<(String, Instant)> = inner
                .map
                .iter()
                .map(|(k, e)| (k.clone(), e.last_accessed))
                .collect();
            by_access.sort_by_key(|(_, accessed)| *accessed);

            let excess = inner.map.len() - target;
            for (key, _) in by_access.into_iter().take(excess) {
                inner.map.remove(&key);
            }
            log::debug!("cache evicted {} entries down to {}", excess, target);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache lock poisoned");
        let total = inner.hits + inner.misses;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.map.len(),
            inserts: inner.inserts,
            hit_rate: if total > 0 { inner.hits as f64 / total as f64 * 100.0 } else { 0.0 },
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.map.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.inserts = 0;
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_stable_and_namespaced() {
        let keys = json!({"request_hash": "abc", "len": 42});
        let a = ResultCache::fingerprint(NS_REQUEST_ANALYSIS, &keys);
        let b = ResultCache::fingerprint(NS_REQUEST_ANALYSIS, &keys);
        let c = ResultCache::fingerprint(NS_TEMPLATE_GENERATION, &keys);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("request_analysis:"));
        assert_eq!(a.split(':').nth(1).unwrap().len(), 16);
    }

    #[test]
    fn test_fingerprint_key_order_irrelevant() {
        // serde_json object keys are sorted, so construction order is immaterial
        let a = ResultCache::fingerprint("ns", &json!({"a": 1, "b": 2}));
        let b = ResultCache::fingerprint("ns", &json!({"b": 2, "a": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_get_miss_then_hit() {
        let cache = ResultCache::new();
        let keys = json!({"q": "배송 안내"});

        assert!(cache.get(NS_POLICY_SEARCH, &keys).is_none());
        cache.set(NS_POLICY_SEARCH, json!({"chunks": 3}), &keys);
        let value = cache.get(NS_POLICY_SEARCH, &keys).unwrap();
        assert_eq!(value["chunks"], 3);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_idempotent_reads() {
        let cache = ResultCache::new();
        let keys = json!({"request_hash": "deadbeef"});
        cache.set(NS_REQUEST_ANALYSIS, json!({"business_type": "education"}), &keys);

        let first = cache.get(NS_REQUEST_ANALYSIS, &keys).unwrap();
        let second = cache.get(NS_REQUEST_ANALYSIS, &keys).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = ResultCache::with_config(10, Duration::ZERO);
        let keys = json!({"k": 1});
        cache.set("ns", json!("v"), &keys);

        assert!(cache.get("ns", &keys).is_none());
        // The expired entry was dropped on read
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_set_replaces_existing() {
        let cache = ResultCache::new();
        let keys = json!({"k": 1});
        cache.set("ns", json!("old"), &keys);
        cache.set("ns", json!("new"), &keys);

        assert_eq!(cache.get("ns", &keys).unwrap(), json!("new"));
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_lru_eviction_on_sweep() {
        // Small capacity; the 100th insert triggers the sweep
        let cache = ResultCache::with_config(50, Duration::from_secs(3600));

        for i in 0..99 {
            cache.set("ns", json!(i), &json!({"k": i}));
        }
        // Touch an early entry so it becomes most-recently-used
        assert!(cache.get("ns", &json!({"k": 0})).is_some());

        cache.set("ns", json!(99), &json!({"k": 99}));

        let stats = cache.stats();
        assert!(stats.size <= 50, "size {} exceeds max", stats.size);
        // The recently touched entry survived eviction
        assert!(cache.get("ns", &json!({"k": 0})).is_some());
    }

    #[test]
    fn test_clear_resets_counters() {
        let cache = ResultCache::new();
        cache.set("ns", json!(1), &json!({"k": 1}));
        cache.get("ns", &json!({"k": 1}));
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;

        let cache = Arc::new(ResultCache::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    let keys = json!({"t": t, "i": i});
                    cache.set("ns", json!(i), &keys);
                    assert!(cache.get("ns", &keys).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits, 400);
        assert_eq!(stats.inserts, 400);
    }
}
