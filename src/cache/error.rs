/// 缓存层错误
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("deserialization error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
