/// 限流缓存键前缀
const RATE_LIMIT_USER_PREFIX: &str = "rate_limit:user:";

/// 生成用户限流缓存键
pub fn rate_limit_key(user_id: &str) -> String {
    format!("{}{}", RATE_LIMIT_USER_PREFIX, user_id)
}
