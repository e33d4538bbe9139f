/// 数据库实体定义
pub mod rate_limit;

pub use rate_limit::RateLimitEntity;
