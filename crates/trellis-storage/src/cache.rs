//! Trellis Cache - Document Cache Abstraction
//!
//! The write-through document cache consumed by the engine. Keys are opaque
//! strings; `purge` accepts a `*`-suffix wildcard so a whole key family can
//! be dropped in one call.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use trellis_common::Value;

// =============================================================================
// Cache Trait
// =============================================================================

/// Cache interface consumed by the document engine.
pub trait Cache: Send + Sync {
    /// Load a value no older than `ttl` seconds, or `None`.
    fn load(&self, key: &str, ttl: u64) -> Option<Value>;

    /// Store a value under a key. Returns whether the save took effect.
    fn save(&self, key: &str, value: Value) -> bool;

    /// Remove a key, or a key family when `pattern` ends in `*`. Returns
    /// whether anything was removed.
    fn purge(&self, pattern: &str) -> bool;
}

// =============================================================================
// Memory Cache
// =============================================================================

/// In-memory cache for testing and single-process deployments.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Instant, Value)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MemoryCache {
    fn load(&self, key: &str, ttl: u64) -> Option<Value> {
        let entries = self.entries.read();
        let (stored_at, value) = entries.get(key)?;
        if stored_at.elapsed() > Duration::from_secs(ttl) {
            return None;
        }
        Some(value.clone())
    }

    fn save(&self, key: &str, value: Value) -> bool {
        if key.is_empty() {
            return false;
        }
        self.entries
            .write()
            .insert(key.to_string(), (Instant::now(), value));
        true
    }

    fn purge(&self, pattern: &str) -> bool {
        let mut entries = self.entries.write();
        match pattern.strip_suffix('*') {
            Some(prefix) => {
                let before = entries.len();
                entries.retain(|key, _| !key.starts_with(prefix));
                before != entries.len()
            }
            None => entries.remove(pattern).is_some(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let cache = MemoryCache::new();
        assert!(cache.save("k1", Value::Int(1)));
        assert_eq!(cache.load("k1", 60), Some(Value::Int(1)));
        assert_eq!(cache.load("missing", 60), None);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = MemoryCache::new();
        cache.save("k1", Value::Int(1));
        assert_eq!(cache.load("k1", 0), None);
    }

    #[test]
    fn test_exact_purge() {
        let cache = MemoryCache::new();
        cache.save("k1", Value::Int(1));
        assert!(cache.purge("k1"));
        assert!(!cache.purge("k1"));
        assert_eq!(cache.load("k1", 60), None);
    }

    #[test]
    fn test_wildcard_purge() {
        let cache = MemoryCache::new();
        cache.save("cache-ns:books:b1:*", Value::Int(1));
        cache.save("cache-ns:books:b1:abcd", Value::Int(2));
        cache.save("cache-ns:books:b2:*", Value::Int(3));

        assert!(cache.purge("cache-ns:books:b1:*"));
        assert_eq!(cache.load("cache-ns:books:b1:*", 60), None);
        assert_eq!(cache.load("cache-ns:books:b1:abcd", 60), None);
        assert_eq!(cache.load("cache-ns:books:b2:*", 60), Some(Value::Int(3)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let cache = MemoryCache::new();
        assert!(!cache.save("", Value::Int(1)));
    }
}
