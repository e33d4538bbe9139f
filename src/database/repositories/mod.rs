/// 存储库：持久层读写接口及其 SQL 实现
pub mod rate_limit;

pub use rate_limit::{PgRateLimitQueries, RateLimitRepository};
