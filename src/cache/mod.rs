/// Full-page response caching
///
/// - `PageCache`: storage contract used by the page cache middleware
/// - `RedisPageCache`: shared cache for multi-instance deployments
/// - `MemoryPageCache`: in-process cache for single instances and tests
pub mod memory_cache;
pub mod redis_cache;

pub use self::memory_cache::MemoryPageCache;
pub use self::redis_cache::RedisPageCache;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A stored response: status, content type and raw body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
}

#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>>;

    async fn put(&self, key: &str, page: &CachedPage, ttl: Duration) -> Result<()>;

    /// Drop every cached page
    async fn clear(&self) -> Result<()>;
}

mod body_base64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_page_serializes_body_as_base64() {
        let page = CachedPage {
            status: 200,
            content_type: Some("application/json".into()),
            body: b"{\"a\":1}".to_vec(),
        };
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains("eyJhIjoxfQ=="));
        let back: CachedPage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, page);
    }
}
