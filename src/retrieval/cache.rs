//! TTL query cache
//!
//! Results are keyed by normalised query text, `k` and the canonical form of
//! the filter. Expired entries are dropped lazily on lookup; there is no size
//! bound and no background sweep.

use crate::types::{Query, RankedResult};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default lifetime of a cached result
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Cache key for a query.
///
/// Text is trimmed and lowercased. The filter is rendered as JSON with sorted
/// keys; a missing, `null` or empty filter renders as `None`.
pub fn cache_key(query: &Query) -> String {
    let filter = query
        .effective_filter()
        .map(canonical_json)
        .unwrap_or_else(|| "None".to_string());
    format!(
        "{}|k={}|where={}",
        query.text.trim().to_lowercase(),
        query.k,
        filter
    )
}

/// Compact JSON with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = fields
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        scalar => scalar.to_string(),
    }
}

#[derive(Debug)]
struct CacheEntry {
    created_at: Instant,
    payload: Arc<RankedResult>,
}

/// Process-local result cache shared by concurrent retrievals
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any. An expired entry is removed.
    pub fn get(&self, key: &str) -> Option<Arc<RankedResult>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !self.is_expired(entry) => return Some(Arc::clone(&entry.payload)),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        // A concurrent put may have refreshed the entry since the read lock
        if entries.get(key).is_some_and(|e| self.is_expired(e)) {
            entries.remove(key);
            debug!("Evicted expired cache entry");
        }
        None
    }

    /// Store a result, replacing any previous entry for `key`
    pub fn put(&self, key: String, payload: Arc<RankedResult>) {
        self.entries.write().insert(
            key,
            CacheEntry {
                created_at: Instant::now(),
                payload,
            },
        );
    }

    /// Number of stored entries, expired ones included until looked up
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.created_at.elapsed() > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn result(id: &str) -> Arc<RankedResult> {
        Arc::new(RankedResult {
            documents: vec![format!("text {id}")],
            metadatas: vec![Default::default()],
            ids: vec![id.to_string()],
            distances: vec![0.1],
        })
    }

    #[test]
    fn test_key_normalises_text() {
        let a = cache_key(&Query::new("  Friendship Story ", 3));
        let b = cache_key(&Query::new("friendship story", 3));
        assert_eq!(a, b);
        assert_eq!(a, "friendship story|k=3|where=None");
        assert_ne!(a, cache_key(&Query::new("friendship story", 4)));
    }

    #[test]
    fn test_key_canonical_filter() {
        let a = cache_key(&Query::new("q", 3).with_filter(json!({"b": 1, "a": {"$in": ["x"]}})));
        let b = cache_key(&Query::new("q", 3).with_filter(json!({"a": {"$in": ["x"]}, "b": 1})));
        assert_eq!(a, b);
        assert!(a.ends_with(r#"where={"a":{"$in":["x"]},"b":1}"#));
    }

    #[test]
    fn test_key_empty_filter_is_absent() {
        let none = cache_key(&Query::new("q", 3));
        assert_eq!(none, cache_key(&Query::new("q", 3).with_filter(json!({}))));
        assert_ne!(none, cache_key(&Query::new("q", 3).with_filter(json!({"a": 1}))));
    }

    #[test]
    fn test_put_and_get() {
        let cache = QueryCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.ttl(), Duration::from_secs(600));

        cache.put("k".to_string(), result("a"));
        assert_eq!(cache.get("k").unwrap().ids, vec!["a"]);
        assert!(cache.get("other").is_none());

        cache.put("k".to_string(), result("b"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").unwrap().ids, vec!["b"]);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let cache = QueryCache::new(Duration::from_millis(150));
        cache.put("k".to_string(), result("a"));
        assert!(cache.get("k").is_some());

        thread::sleep(Duration::from_millis(300));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = QueryCache::with_ttl_secs(60);
        cache.put("a".to_string(), result("a"));
        cache.put("b".to_string(), result("b"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = QueryCache::default();
        thread::scope(|s| {
            for t in 0..4 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..50 {
                        let key = format!("{}", i % 10);
                        cache.put(key.clone(), result(&format!("{t}-{i}")));
                        assert!(cache.get(&key).is_some());
                    }
                });
            }
        });
        assert_eq!(cache.len(), 10);
    }
}
