//! Redis-backed cache.
//!
//! Mirrors the original Python service's `redis.Redis.from_url(...)` +
//! `GET`/`SETEX` pair, but lazily opens a multiplexed async connection on
//! first use instead of eagerly connecting at import time, so a
//! momentarily-down Redis doesn't block startup — a single bad call just
//! degrades to a cache miss, per the best-effort contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::warn;

use super::Cache;

pub struct RedisCache {
    url: String,
    conn: RwLock<Option<Arc<redis::aio::MultiplexedConnection>>>,
}

impl RedisCache {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            conn: RwLock::new(None),
        }
    }

    async fn connection(&self) -> Option<Arc<redis::aio::MultiplexedConnection>> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Some(conn.clone());
        }
        let mut guard = self.conn.write().await;
        if let Some(conn) = guard.as_ref() {
            return Some(conn.clone());
        }
        let client = match redis::Client::open(self.url.as_str()) {
            Ok(c) => c,
            Err(e) => {
                warn!("redis client open failed: {e}");
                return None;
            }
        };
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                let conn = Arc::new(conn);
                *guard = Some(conn.clone());
                Some(conn)
            }
            Err(e) => {
                warn!("redis connect failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let conn = self.connection().await?;
        let mut conn = (*conn).clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(v) => v,
            Err(e) => {
                warn!("redis GET {key} failed: {e}");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) {
        let Some(conn) = self.connection().await else {
            return;
        };
        let mut conn = (*conn).clone();
        let ttl_secs = ttl.as_secs().max(1);
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
        {
            warn!("redis SETEX {key} failed: {e}");
        }
    }
}
