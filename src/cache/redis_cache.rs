use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CachedPage, PageCache};
use crate::error::{AppError, Result};

/// Page cache manager using Redis
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

const NAMESPACE: &str = "blog:page";

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", NAMESPACE, key)
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>> {
        let redis_key = self.redis_key(key);
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(&redis_key).await? {
            Some(data) => {
                debug!(key = %redis_key, "page cache HIT");
                serde_json::from_str::<CachedPage>(&data)
                    .map(Some)
                    .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))
            }
            None => {
                debug!(key = %redis_key, "page cache MISS");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, page: &CachedPage, ttl: Duration) -> Result<()> {
        let redis_key = self.redis_key(key);
        let data = serde_json::to_string(page)?;
        let ttl_secs = ttl.as_secs().max(1);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&redis_key, data, ttl_secs).await?;

        debug!(key = %redis_key, ttl_secs, "page cache WRITE");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let pattern = format!("{}:*", NAMESPACE);
        let mut conn = self.redis.clone();

        let keys: Vec<String> = {
            let mut iter = conn.scan_match::<_, String>(&pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(());
        }

        let removed = keys.len();
        if let Err(e) = conn.del::<_, ()>(keys).await {
            warn!("Failed to clear page cache: {}", e);
            return Err(e.into());
        }

        debug!(removed, "page cache CLEAR");
        Ok(())
    }
}
