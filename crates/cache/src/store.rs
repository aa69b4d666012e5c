use crate::key::CacheKey;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Metadata recorded alongside a cached value.
#[derive(Debug, Clone, Default)]
pub struct CacheMetadata {
    pub model_used: String,
    pub execution_time_ms: u64,
}

/// A cache hit: the stored value plus its provenance.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub value: serde_json::Value,
    pub model_used: String,
    pub execution_time_ms: u64,
    pub age: Duration,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
}

#[derive(Debug)]
struct CacheEntry {
    value: serde_json::Value,
    cached_at: Instant,
    ttl: Duration,
    metadata: CacheMetadata,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
    expirations: u64,
}

/// In-memory TTL cache for analysis results.
///
/// One `Mutex` guards the whole map; every operation is a short critical
/// section, so contention is not a concern at the request rates this
/// substrate sees. Share via `Arc<AnalysisCache>`.
#[derive(Debug)]
pub struct AnalysisCache {
    inner: Mutex<CacheState>,
    default_ttl: Duration,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl AnalysisCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheState::default()),
            default_ttl,
        }
    }

    /// Look up a key. Entries past their TTL are evicted here, on read,
    /// and count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<CachedAnalysis> {
        let mut state = self.inner.lock().expect("cache mutex poisoned");

        if let Some(entry) = state.entries.get(key) {
            let age = entry.cached_at.elapsed();
            if age <= entry.ttl {
                let hit = CachedAnalysis {
                    value: entry.value.clone(),
                    model_used: entry.metadata.model_used.clone(),
                    execution_time_ms: entry.metadata.execution_time_ms,
                    age,
                };
                state.hits += 1;
                return Some(hit);
            }
            state.entries.remove(key);
            state.expirations += 1;
            log::debug!("cache entry expired: {key}");
        }

        state.misses += 1;
        None
    }

    /// Store a value under the default TTL. Last write wins.
    pub fn put(&self, key: CacheKey, value: serde_json::Value, metadata: CacheMetadata) {
        self.put_with_ttl(key, value, metadata, self.default_ttl);
    }

    pub fn put_with_ttl(
        &self,
        key: CacheKey,
        value: serde_json::Value,
        metadata: CacheMetadata,
        ttl: Duration,
    ) {
        let mut state = self.inner.lock().expect("cache mutex poisoned");
        state.entries.insert(
            key,
            CacheEntry {
                value,
                cached_at: Instant::now(),
                ttl,
                metadata,
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock().expect("cache mutex poisoned");
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            expirations: state.expirations,
        }
    }

    /// Clear one entry, or everything when `key` is `None`.
    pub fn clear(&self, key: Option<&CacheKey>) {
        let mut state = self.inner.lock().expect("cache mutex poisoned");
        match key {
            Some(key) => {
                state.entries.remove(key);
            }
            None => state.entries.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_protocol::TaskParams;
    use pretty_assertions::assert_eq;

    fn key(task: &str) -> CacheKey {
        CacheKey::generate(task, &TaskParams::new(), &["/a.rs"])
    }

    fn meta() -> CacheMetadata {
        CacheMetadata {
            model_used: "model-x".to_string(),
            execution_time_ms: 12,
        }
    }

    #[test]
    fn put_then_get_round_trips_value_and_metadata() {
        let cache = AnalysisCache::default();
        cache.put(key("t"), serde_json::json!({"ok": true}), meta());

        let hit = cache.get(&key("t")).unwrap();
        assert_eq!(hit.value["ok"], true);
        assert_eq!(hit.model_used, "model-x");
        assert_eq!(hit.execution_time_ms, 12);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = AnalysisCache::default();
        let ttl = Duration::from_millis(30);
        cache.put_with_ttl(key("t"), serde_json::json!(1), meta(), ttl);

        assert!(cache.get(&key("t")).is_some(), "fresh entry should hit");

        std::thread::sleep(ttl + Duration::from_millis(20));
        assert!(cache.get(&key("t")).is_none(), "stale entry should miss");

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.entries, 0, "expired entry is evicted lazily");
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = AnalysisCache::default();
        assert!(cache.get(&key("t")).is_none());
        cache.put(key("t"), serde_json::json!(1), meta());
        cache.get(&key("t"));
        cache.get(&key("t"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn clear_one_and_clear_all() {
        let cache = AnalysisCache::default();
        cache.put(key("a"), serde_json::json!(1), meta());
        cache.put(key("b"), serde_json::json!(2), meta());

        cache.clear(Some(&key("a")));
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());

        cache.clear(None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn last_write_wins() {
        let cache = AnalysisCache::default();
        cache.put(key("t"), serde_json::json!(1), meta());
        cache.put(key("t"), serde_json::json!(2), meta());
        assert_eq!(cache.get(&key("t")).unwrap().value, serde_json::json!(2));
    }
}
