use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;

/// 字节级键值缓存，每个条目带过期时间
///
/// 没有比较并交换或原子自增，所有更新都是完整的读取-修改-写回。
#[async_trait]
pub trait Cache: Send + Sync {
    async fn connect(&self) -> CacheResult<()>;

    async fn disconnect(&self) -> CacheResult<()>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// 未命中返回 `Ok(None)`
    async fn fetch(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn delete(&self, key: &str) -> CacheResult<()>;
}
