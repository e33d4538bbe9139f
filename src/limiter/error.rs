use crate::cache::CacheError;
use crate::database::StoreError;

/// 限流服务错误
///
/// 拒绝请求不是错误，只以 `Ok(false)` 返回。
#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    #[error("rate limit not found for user {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("store failed to {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("cache failed to {op}: {source}")]
    Cache {
        op: &'static str,
        #[source]
        source: CacheError,
    },

    #[error("deadline exceeded while trying to {op}")]
    Timeout { op: &'static str },
}

pub type LimiterResult<T> = Result<T, LimiterError>;

/// 为持久层和缓存层错误附加操作名
pub(crate) trait Context<T> {
    fn context(self, op: &'static str) -> LimiterResult<T>;
}

impl<T> Context<T> for Result<T, StoreError> {
    fn context(self, op: &'static str) -> LimiterResult<T> {
        self.map_err(|source| LimiterError::Store { op, source })
    }
}

impl<T> Context<T> for Result<T, CacheError> {
    fn context(self, op: &'static str) -> LimiterResult<T> {
        self.map_err(|source| LimiterError::Cache { op, source })
    }
}
