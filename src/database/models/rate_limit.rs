use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 用户限流窗口记录
///
/// 每个用户一条，保存当前固定窗口的计数、上限和窗口起点。
/// `user_id` 逻辑上唯一，但表上没有唯一约束，依赖“先查后建”。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RateLimitEntity {
    /// 主键，创建前为空字符串
    pub id: String,
    pub user_id: String,
    pub request_count: i32,
    pub rate_limit: i32,
    pub window_start: DateTime<Utc>,
}

impl RateLimitEntity {
    /// 构造尚未持久化的新记录
    pub fn new(user_id: &str, request_count: i32, rate_limit: i32, window_start: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            request_count,
            rate_limit,
            window_start,
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }
}
