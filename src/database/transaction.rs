use async_trait::async_trait;

use crate::database::error::{StoreError, StoreResult};
use crate::database::repositories::RateLimitRepository;

/// 后端事务句柄
///
/// 句柄被丢弃而未提交时，后端必须丢弃其中的全部写入
/// （sqlx 的事务在 drop 时回滚，内存后端直接丢弃暂存区）。
#[async_trait]
pub trait TransactionHandle: Send {
    /// 事务内的限流记录存储库
    fn rate_limits(&mut self) -> &mut dyn RateLimitRepository;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// 事务工厂，从共享连接池中开启事务
#[async_trait]
pub trait TransactionFactory: Send + Sync {
    async fn begin_handle(&self) -> StoreResult<Box<dyn TransactionHandle>>;

    async fn begin(&self) -> StoreResult<DbTransaction> {
        let handle = self.begin_handle().await?;
        Ok(DbTransaction::new(handle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// 作用域事务
///
/// 每次 `begin` 恰好对应一次提交或回滚。调用方在所有退出路径上调用
/// [`rollback_unless_committed`](Self::rollback_unless_committed)；
/// 未来得及调用（例如请求超时被取消）时由 `Drop` 丢弃句柄完成回滚。
pub struct DbTransaction {
    handle: Option<Box<dyn TransactionHandle>>,
    state: TransactionState,
}

impl DbTransaction {
    pub fn new(handle: Box<dyn TransactionHandle>) -> Self {
        Self {
            handle: Some(handle),
            state: TransactionState::Open,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == TransactionState::Committed
    }

    /// 事务内的存储库，事务结束后返回 `NoTransaction`
    pub fn rate_limits(&mut self) -> StoreResult<&mut dyn RateLimitRepository> {
        match self.handle.as_mut() {
            Some(handle) => Ok(handle.rate_limits()),
            None => Err(StoreError::NoTransaction),
        }
    }

    pub async fn commit(&mut self) -> StoreResult<()> {
        let handle = self.handle.take().ok_or(StoreError::NoTransaction)?;
        match handle.commit().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(e) => {
                // 提交失败时句柄已被消耗，后端已放弃该事务
                self.state = TransactionState::RolledBack;
                Err(e)
            }
        }
    }

    pub async fn rollback(&mut self) -> StoreResult<()> {
        let handle = self.handle.take().ok_or(StoreError::NoTransaction)?;
        self.state = TransactionState::RolledBack;
        handle.rollback().await
    }

    /// 已提交或已回滚时不做任何事
    pub async fn rollback_unless_committed(&mut self) {
        if self.handle.is_none() {
            return;
        }
        if let Err(e) = self.rollback().await {
            tracing::warn!("Failed to roll back transaction: {}", e);
        }
    }
}

impl Drop for DbTransaction {
    fn drop(&mut self) {
        if self.handle.take().is_some() {
            self.state = TransactionState::RolledBack;
            tracing::warn!("Transaction dropped while still open, rolling back");
        }
    }
}
