//! In-process query cache
//!
//! Responses are stored under a hierarchical key such as
//! `["livestock", "list", "status=SICK"]`. A mutation invalidates every key
//! that starts with its aggregate, so a later read goes back to the server.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default entry lifetime in seconds.
/// Can be overridden via FARM_QUERY_CACHE_TTL_SECS.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Hierarchical cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        prefix.len() <= self.0.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

struct Entry {
    value: serde_json::Value,
    stored_at: Instant,
}

pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_env() -> Self {
        let ttl_secs = std::env::var("FARM_QUERY_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        Self::new(Duration::from_secs(ttl_secs))
    }

    /// Fresh cached value, if any; expired entries are dropped
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let mut entries = self.lock();
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.ttl)?;
        if !fresh {
            debug!(key = ?key, "Cache entry expired");
            entries.remove(key);
            return None;
        }
        let value = entries.get(key).map(|entry| entry.value.clone())?;
        match serde_json::from_value(value) {
            Ok(hit) => {
                debug!(key = ?key, "Cache hit");
                Some(hit)
            },
            Err(_) => None,
        }
    }

    pub fn insert<T: Serialize>(&self, key: QueryKey, value: &T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.lock().insert(
                key,
                Entry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every entry under `prefix`; returns how many went
    pub fn invalidate(&self, prefix: &[&str]) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(prefix = ?prefix, removed, "Invalidated cached queries");
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_insert() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let key = QueryKey::new(["species", "list"]);
        cache.insert(key.clone(), &vec!["Bò vàng", "Lợn nái"]);

        let hit: Option<Vec<String>> = cache.get(&key);
        assert_eq!(hit.unwrap(), vec!["Bò vàng", "Lợn nái"]);
        assert!(cache.get::<Vec<String>>(&QueryKey::new(["species", "other"])).is_none());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = QueryCache::new(Duration::ZERO);
        let key = QueryKey::new(["diseases", "list"]);
        cache.insert(key.clone(), &1);

        assert!(cache.get::<i32>(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(QueryKey::new(["livestock", "list", ""]), &1);
        cache.insert(QueryKey::new(["livestock", "detail", "000001"]), &2);
        cache.insert(QueryKey::new(["livestock-summary"]), &3);
        cache.insert(QueryKey::new(["species", "list"]), &4);

        assert_eq!(cache.invalidate(&["livestock"]), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate(&[]), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prefix_longer_than_key_does_not_match() {
        let key = QueryKey::new(["reports"]);
        assert!(!key.starts_with(&["reports", "dashboard"]));
        assert!(key.starts_with(&["reports"]));
    }
}
