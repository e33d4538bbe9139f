use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::driver::Cache;
use super::error::{CacheError, CacheResult};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// 进程内缓存，过期条目在读取和写入时清除
///
/// 时间取自 `tokio::time`，测试中可以暂停并快进时钟。
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory cache lock poisoned".into()))
    }

    /// 当前未过期的条目数
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries()
            .map(|e| e.values().filter(|entry| entry.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 剩余存活时间，条目不存在或已过期时返回 `None`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn connect(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> CacheResult<()> {
        self.entries()?.clear();
        Ok(())
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_vec(),
            expires_at: now + ttl,
        };
        let mut entries = self.entries()?;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn fetch(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
