//! In-process cache backend.
//!
//! Used when `REDIS_URL` is not configured. Backed by [`dashmap`] (the
//! same concurrent map the teacher pack's example services reach for
//! instead of a `Mutex<HashMap<_>>`), so concurrent probes of distinct
//! video ids never contend on a single lock.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::Cache;

struct Entry {
    value: String,
    expires_at: Instant,
}

pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_after_put_returns_value() {
        let cache = MemoryCache::new();
        cache
            .put("k", "v".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn get_after_ttl_expiry_returns_none() {
        let cache = MemoryCache::new();
        cache
            .put("k", "v".to_string(), Duration::from_millis(1))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn json_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Thing {
            n: u32,
        }
        let cache = MemoryCache::new();
        super::super::put_json(&cache, "k", &Thing { n: 7 }, Duration::from_secs(60)).await;
        let got: Option<Thing> = super::super::get_json(&cache, "k").await;
        assert_eq!(got, Some(Thing { n: 7 }));
    }
}
