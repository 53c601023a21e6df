//! Opaque key→string cache with TTL.
//!
//! Used only by the extractor adapter to memoize `Probe` JSON. Every
//! operation is best-effort: a backend failure degrades to "cache miss"
//! rather than propagating an error, matching the original service's
//! `try: ... except Exception: return None / pass` cache wrapper.

pub mod memory;
pub mod redis_backend;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::MemoryCache;
pub use redis_backend::RedisCache;

/// Backend-agnostic cache contract. No negative caching, no stampede
/// protection, no locking — concurrent resolvers of the same key may
/// duplicate work, which is an accepted tradeoff (SPEC_FULL.md §9).
///
/// Kept free of generic methods so it stays object-safe (`Box<dyn
/// Cache>` is how `AppState` holds it); the JSON convenience helpers
/// live as free functions below instead of trait methods.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: String, ttl: Duration);
}

/// `get` + JSON-decode, returning `None` on a cache miss or a decode
/// failure (a corrupt or stale-schema cache entry is treated as absent,
/// never as an error).
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    serde_json::from_str(&raw).ok()
}

/// JSON-encode + `put`; silently does nothing if encoding fails.
pub async fn put_json<T: Serialize + Sync>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    if let Ok(raw) = serde_json::to_string(value) {
        cache.put(key, raw, ttl).await;
    }
}

/// Build the cache backend named by configuration: Redis when `redis_url`
/// is set, otherwise an in-process store. See SPEC_FULL.md §4.1.
pub fn build(cfg: &crate::config::Config) -> Box<dyn Cache> {
    if cfg.redis_url.trim().is_empty() {
        tracing::info!("cache backend: in-memory (REDIS_URL unset)");
        Box::new(MemoryCache::new())
    } else {
        tracing::info!(url = %cfg.redis_url, "cache backend: redis");
        Box::new(RedisCache::new(&cfg.redis_url))
    }
}
