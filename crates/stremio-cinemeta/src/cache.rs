//! Meta caching.
//!
//! The client consults a [`Cache`] before every remote lookup. Entries carry
//! their creation time so the client can apply its own TTL; the cache itself
//! never expires anything.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::Result;
use crate::types::Meta;

/// A cached meta object together with the time it was stored.
#[derive(Debug, Clone)]
pub struct CacheItem {
    pub meta: Meta,
    pub created: DateTime<Utc>,
}

/// Storage used by the client for caching meta objects.
///
/// Implementations are usually thin wrappers around an existing cache or
/// key-value store. Keys are IMDb IDs.
pub trait Cache: Send + Sync {
    fn set(&self, key: &str, meta: Meta) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<CacheItem>>;
}

/// Process-local [`Cache`] backed by a concurrent map.
///
/// Nothing is persisted, so every restart begins with an empty cache.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    items: DashMap<String, CacheItem>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Store an item with an explicit creation time.
    pub fn insert_at(&self, key: &str, meta: Meta, created: DateTime<Utc>) {
        self.items
            .insert(key.to_string(), CacheItem { meta, created });
    }
}

impl Cache for InMemoryCache {
    fn set(&self, key: &str, meta: Meta) -> Result<()> {
        self.insert_at(key, meta, Utc::now());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<CacheItem>> {
        Ok(self.items.get(key).map(|item| item.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let cache = InMemoryCache::new();
        assert!(cache.get("tt1254207").unwrap().is_none());

        let meta = Meta {
            id: "tt1254207".into(),
            name: "Big Buck Bunny".into(),
            ..Default::default()
        };
        cache.set("tt1254207", meta.clone()).unwrap();

        let item = cache.get("tt1254207").unwrap().expect("cached");
        assert_eq!(item.meta, meta);
        assert!(item.created <= Utc::now());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn set_overwrites() {
        let cache = InMemoryCache::new();
        cache
            .set("tt1", Meta { name: "Old".into(), ..Default::default() })
            .unwrap();
        cache
            .set("tt1", Meta { name: "New".into(), ..Default::default() })
            .unwrap();
        assert_eq!(cache.get("tt1").unwrap().unwrap().meta.name, "New");
        assert_eq!(cache.len(), 1);
    }
}
