// 缓存模块
// 包含缓存驱动、缓存数据结构和操作逻辑

pub mod driver;
pub mod error;
pub mod keys;
pub mod memory;
pub mod models;
pub mod operations;
pub mod redis;

// 重新导出常用类型和函数，方便其他模块使用
pub use driver::Cache;
pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
pub use operations::RateLimitCacheOperations;
pub use self::redis::RedisCache;
