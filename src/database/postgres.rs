use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::error::StoreResult;
use crate::database::models::RateLimitEntity;
use crate::database::repositories::{PgRateLimitQueries, RateLimitRepository};
use crate::database::transaction::{TransactionFactory, TransactionHandle};

/// 执行内嵌的数据库迁移
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// 基于连接池的 Postgres 事务工厂
#[derive(Clone)]
pub struct PgTransactionFactory {
    pool: PgPool,
}

impl PgTransactionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionFactory for PgTransactionFactory {
    async fn begin_handle(&self) -> StoreResult<Box<dyn TransactionHandle>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// Postgres 事务句柄，同时充当事务内的存储库
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionHandle for PgTransaction {
    fn rate_limits(&mut self) -> &mut dyn RateLimitRepository {
        self
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitRepository for PgTransaction {
    async fn create(&mut self, record: &RateLimitEntity) -> StoreResult<String> {
        PgRateLimitQueries::create(&mut self.tx, record).await
    }

    async fn find_by_user_id(&mut self, user_id: &str) -> StoreResult<Option<RateLimitEntity>> {
        PgRateLimitQueries::find_by_user_id(&mut self.tx, user_id).await
    }

    async fn update(&mut self, record: &RateLimitEntity) -> StoreResult<()> {
        PgRateLimitQueries::update(&mut self.tx, record).await
    }

    async fn delete_by_user_id(&mut self, user_id: &str) -> StoreResult<()> {
        PgRateLimitQueries::delete_by_user_id(&mut self.tx, user_id).await
    }

    async fn update_rate_limit(&mut self, user_id: &str, new_rate_limit: i32) -> StoreResult<()> {
        PgRateLimitQueries::update_rate_limit(&mut self.tx, user_id, new_rate_limit).await
    }
}
