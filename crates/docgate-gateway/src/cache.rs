//! Bounded TTL cache for read results.
//!
//! One mutex around a small map; operations are O(size) worst case and
//! the lock is never held across a backend call. Expired entries are
//! evicted lazily on lookup; inserting past `max_size` evicts the
//! least-recently-used entry first.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use docgate_core::policy::Operation;

struct Entry {
    value: Value,
    inserted_at: Instant,
    /// Monotonic recency stamp; refreshed on every hit.
    touched: u64,
}

struct Inner {
    map: HashMap<String, Entry>,
    seq: u64,
}

/// TTL + LRU bounded key/value store.
pub struct TtlCache {
    ttl: Duration,
    max_size: usize,
    inner: Mutex<Inner>,
}

/// Canonical cache key for a read request.
///
/// `params` is the normalized request parameter block (name, filters,
/// fields, pagination). It is serialized through `serde_json`, whose
/// object representation is key-sorted, so semantically identical
/// requests always collide and different ones never do. The doctype
/// segment is the invalidation prefix.
pub fn cache_key(doctype: &str, op: Operation, params: &Value) -> String {
    format!("{doctype}|{op}|{params}")
}

fn doctype_prefix(doctype: &str) -> String {
    format!("{doctype}|")
}

impl TtlCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size: max_size.max(1),
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                seq: 0,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: String, value: Value) {
        self.put_at(key, value, Instant::now());
    }

    /// Remove every entry whose key encodes this doctype. Called after
    /// any successful write so stale reads are never served.
    pub fn invalidate_doctype(&self, doctype: &str) {
        let prefix = doctype_prefix(doctype);
        let mut inner = self.lock();
        inner.map.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        let mut inner = self.lock();
        let expired = match inner.map.get(key) {
            Some(entry) => now.duration_since(entry.inserted_at) > self.ttl,
            None => return None,
        };
        if expired {
            inner.map.remove(key);
            return None;
        }
        inner.seq += 1;
        let seq = inner.seq;
        let entry = inner.map.get_mut(key)?;
        entry.touched = seq;
        Some(entry.value.clone())
    }

    fn put_at(&self, key: String, value: Value, now: Instant) {
        let mut inner = self.lock();
        if !inner.map.contains_key(&key) && inner.map.len() >= self.max_size {
            Self::evict_lru(&mut inner);
        }
        inner.seq += 1;
        let touched = inner.seq;
        inner.map.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                touched,
            },
        );
    }

    /// Evict the least-recently-used entry (smallest recency stamp).
    fn evict_lru(inner: &mut Inner) {
        let victim = inner
            .map
            .iter()
            .min_by_key(|(_, e)| e.touched)
            .map(|(k, _)| k.clone());
        if let Some(k) = victim {
            inner.map.remove(&k);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a panic mid-mutation; the map holds
        // only cache data, so continuing with it is safe.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(doctype: &str, n: usize) -> String {
        cache_key(doctype, Operation::Read, &json!({ "limit": n }))
    }

    #[test]
    fn get_before_ttl_hits_after_ttl_misses() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        let t0 = Instant::now();
        cache.put_at(key("Customer", 1), json!({"x": 1}), t0);

        assert_eq!(
            cache.get_at(&key("Customer", 1), t0 + Duration::from_secs(59)),
            Some(json!({"x": 1}))
        );
        assert_eq!(
            cache.get_at(&key("Customer", 1), t0 + Duration::from_secs(61)),
            None
        );
        // Expired entry was evicted lazily.
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_replaces_value() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        cache.put(key("Item", 1), json!(1));
        cache.put(key("Item", 1), json!(2));
        assert_eq!(cache.get(&key("Item", 1)), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lru_eviction_bounds_size() {
        let cache = TtlCache::new(Duration::from_secs(60), 2);
        cache.put(key("A", 1), json!(1));
        cache.put(key("B", 1), json!(2));
        // Touch A so B becomes the LRU victim.
        assert!(cache.get(&key("A", 1)).is_some());
        cache.put(key("C", 1), json!(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("A", 1)).is_some());
        assert!(cache.get(&key("B", 1)).is_none());
        assert!(cache.get(&key("C", 1)).is_some());
    }

    #[test]
    fn invalidate_doctype_removes_all_matching_keys() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        cache.put(key("Customer", 1), json!(1));
        cache.put(key("Customer", 2), json!(2));
        cache.put(key("Item", 1), json!(3));

        cache.invalidate_doctype("Customer");

        assert!(cache.get(&key("Customer", 1)).is_none());
        assert!(cache.get(&key("Customer", 2)).is_none());
        assert_eq!(cache.get(&key("Item", 1)), Some(json!(3)));
    }

    #[test]
    fn keys_are_canonical_across_filter_orderings() {
        // serde_json objects are key-sorted, so two spellings of the
        // same filter set must produce one key.
        let a: Value =
            serde_json::from_str(r#"{"filters":{"status":"Open","city":"Oslo"},"limit":20}"#)
                .unwrap();
        let b: Value =
            serde_json::from_str(r#"{"limit":20,"filters":{"city":"Oslo","status":"Open"}}"#)
                .unwrap();
        let ka = cache_key("Customer", Operation::Read, &a);
        let kb = cache_key("Customer", Operation::Read, &b);
        assert_eq!(ka, kb);

        let c: Value =
            serde_json::from_str(r#"{"filters":{"status":"Open","city":"Oslo"},"limit":21}"#)
                .unwrap();
        assert_ne!(ka, cache_key("Customer", Operation::Read, &c));
    }

    #[test]
    fn distinct_doctypes_never_collide() {
        let params = json!({ "limit": 20 });
        let ka = cache_key("Customer", Operation::Read, &params);
        let kb = cache_key("Item", Operation::Read, &params);
        assert_ne!(ka, kb);
    }
}
