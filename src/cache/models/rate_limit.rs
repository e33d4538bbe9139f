use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::RateLimitEntity;

/// 限流记录的缓存镜像
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CachedRateLimit {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub request_count: i32,
    #[serde(default)]
    pub rate_limit: i32,
    pub window_start: DateTime<Utc>,
}

impl From<&RateLimitEntity> for CachedRateLimit {
    fn from(record: &RateLimitEntity) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            request_count: record.request_count,
            rate_limit: record.rate_limit,
            window_start: record.window_start,
        }
    }
}

impl From<CachedRateLimit> for RateLimitEntity {
    fn from(cached: CachedRateLimit) -> Self {
        Self {
            id: cached.id,
            user_id: cached.user_id,
            request_count: cached.request_count,
            rate_limit: cached.rate_limit,
            window_start: cached.window_start,
        }
    }
}
