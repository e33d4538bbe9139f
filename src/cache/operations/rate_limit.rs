use std::time::Duration;

use crate::cache::driver::Cache;
use crate::cache::error::{CacheError, CacheResult};
use crate::cache::keys::rate_limit_key;
use crate::cache::models::CachedRateLimit;
use crate::database::models::RateLimitEntity;

/// 速率限制缓存操作
pub struct RateLimitCacheOperations;

impl RateLimitCacheOperations {
    /// 读取用户的限流镜像，未命中返回 `None`
    pub async fn get_rate_limit(
        cache: &dyn Cache,
        user_id: &str,
    ) -> CacheResult<Option<RateLimitEntity>> {
        let key = rate_limit_key(user_id);
        match cache.fetch(&key).await? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// 写入或刷新用户的限流镜像
    pub async fn set_rate_limit(
        cache: &dyn Cache,
        record: &RateLimitEntity,
        ttl: Duration,
    ) -> CacheResult<()> {
        let key = rate_limit_key(&record.user_id);
        let bytes = Self::encode(record)?;
        cache.set(&key, &bytes, ttl).await
    }

    /// 删除用户的限流镜像
    pub async fn remove_rate_limit(cache: &dyn Cache, user_id: &str) -> CacheResult<()> {
        cache.delete(&rate_limit_key(user_id)).await
    }

    pub fn encode(record: &RateLimitEntity) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(&CachedRateLimit::from(record)).map_err(CacheError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> CacheResult<RateLimitEntity> {
        let cached: CachedRateLimit = serde_json::from_slice(bytes).map_err(CacheError::Decode)?;
        Ok(cached.into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn mirror_keeps_every_record_field() {
        let cache = MemoryCache::new();
        let record = RateLimitEntity {
            id: "0b7c1f2e-6a8e-4a57-9a53-4f6a3c1d2e10".into(),
            user_id: "alice".into(),
            request_count: 7,
            rate_limit: 10,
            window_start: Utc.with_ymd_and_hms(2024, 9, 1, 12, 30, 15).unwrap(),
        };

        RateLimitCacheOperations::set_rate_limit(&cache, &record, Duration::from_secs(10))
            .await
            .unwrap();
        let cached = RateLimitCacheOperations::get_rate_limit(&cache, "alice")
            .await
            .unwrap();

        assert_eq!(cached, Some(record));
        assert!(cache.ttl(&rate_limit_key("alice")).is_some());
    }

    #[tokio::test]
    async fn miss_is_none() {
        let cache = MemoryCache::new();
        let cached = RateLimitCacheOperations::get_rate_limit(&cache, "nobody")
            .await
            .unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn garbage_payload_is_a_decode_error() {
        let cache = MemoryCache::new();
        cache
            .set(&rate_limit_key("mallory"), b"not json", Duration::from_secs(10))
            .await
            .unwrap();

        let result = RateLimitCacheOperations::get_rate_limit(&cache, "mallory").await;
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }

    #[test]
    fn payload_uses_camel_case_fields() {
        let record = RateLimitEntity::new("bob", 1, 100, Utc::now());
        let json: serde_json::Value =
            serde_json::from_slice(&RateLimitCacheOperations::encode(&record).unwrap()).unwrap();

        assert_eq!(json["userId"], "bob");
        assert_eq!(json["requestCount"], 1);
        assert_eq!(json["rateLimit"], 100);
        assert!(json["windowStart"].is_string());
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let payload = br#"{"userId":"u1","requestCount":2,"windowStart":"2024-09-01T00:00:00Z"}"#;
        let record = RateLimitCacheOperations::decode(payload).unwrap();

        assert_eq!(record.request_count, 2);
        assert_eq!(record.rate_limit, 0);
        assert!(record.id.is_empty());
    }
}
