use serde::{Deserialize, Serialize};

use crate::limiter::RateStatus;
use crate::utils::format_window;

#[derive(Debug, Deserialize)]
pub struct CheckRateLimitRequest {
    pub user_id: String,
    /// 缺省或为 0 时使用已保存的上限
    #[serde(default)]
    pub limit: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckRateLimitResponse {
    pub allowed: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitStatusResponse {
    pub user_id: String,
    pub limit: i32,
    /// 实际是窗口内已用次数
    pub remaining: i32,
    pub window: String,
}

impl From<RateStatus> for RateLimitStatusResponse {
    fn from(status: RateStatus) -> Self {
        Self {
            user_id: status.user_id,
            limit: status.limit,
            remaining: status.remaining,
            window: format_window(status.window),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRateLimitRequest {
    pub new_limit: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRateLimitResponse {
    pub user_id: String,
    pub updated_limit: i32,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveRateLimitResponse {
    pub user_id: String,
    pub message: String,
}
