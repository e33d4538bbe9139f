use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::sync::RwLock;

use super::driver::Cache;
use super::error::CacheResult;

/// Redis 缓存
///
/// 复用一个多路复用连接；未连接时按需建立。
pub struct RedisCache {
    client: RedisClient,
    conn: RwLock<Option<MultiplexedConnection>>,
}

impl RedisCache {
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            conn: RwLock::new(None),
        }
    }

    pub fn open(url: &str) -> CacheResult<Self> {
        Ok(Self::new(RedisClient::open(url)?))
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.conn.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn connect(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("Connected to Redis ({})", pong);
        Ok(())
    }

    async fn disconnect(&self) -> CacheResult<()> {
        // 多路复用连接在最后一个克隆被丢弃时关闭
        self.conn.write().await.take();
        Ok(())
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        // PX 不接受 0
        let millis = ttl.as_millis().clamp(1, u64::MAX as u128) as u64;
        let _: () = conn.pset_ex(key, value, millis).await?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
