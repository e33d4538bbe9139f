use async_trait::async_trait;
use sqlx::PgConnection;

use crate::database::error::StoreResult;
use crate::database::models::RateLimitEntity;

/// 限流记录存储库
///
/// 所有方法都在外部事务内执行，由 [`DbTransaction`](crate::database::DbTransaction) 提供。
#[async_trait]
pub trait RateLimitRepository: Send {
    /// 插入新记录，返回生成的主键
    async fn create(&mut self, record: &RateLimitEntity) -> StoreResult<String>;

    /// 按用户查找记录，不存在时返回 `None`
    async fn find_by_user_id(&mut self, user_id: &str) -> StoreResult<Option<RateLimitEntity>>;

    /// 按主键覆盖计数、上限和窗口起点
    async fn update(&mut self, record: &RateLimitEntity) -> StoreResult<()>;

    /// 删除用户的记录，没有记录时什么也不做
    async fn delete_by_user_id(&mut self, user_id: &str) -> StoreResult<()>;

    /// 只修改上限字段
    async fn update_rate_limit(&mut self, user_id: &str, new_rate_limit: i32) -> StoreResult<()>;
}

/// Postgres 上的限流记录 SQL
pub struct PgRateLimitQueries;

impl PgRateLimitQueries {
    pub async fn create(conn: &mut PgConnection, record: &RateLimitEntity) -> StoreResult<String> {
        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO user_rate_limits (user_id, request_count, rate_limit, window_start)
            VALUES ($1, $2, $3, $4)
            RETURNING id::text
            "#,
        )
        .bind(&record.user_id)
        .bind(record.request_count)
        .bind(record.rate_limit)
        .bind(record.window_start)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!("Created rate limit record {} for user {}", id, record.user_id);
        Ok(id)
    }

    pub async fn find_by_user_id(
        conn: &mut PgConnection,
        user_id: &str,
    ) -> StoreResult<Option<RateLimitEntity>> {
        let record = sqlx::query_as::<_, RateLimitEntity>(
            r#"
            SELECT
                id::text AS id,
                user_id,
                request_count,
                rate_limit,
                window_start
            FROM user_rate_limits
            WHERE user_id = $1
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    pub async fn update(conn: &mut PgConnection, record: &RateLimitEntity) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE user_rate_limits
            SET request_count = $1, rate_limit = $2, window_start = $3
            WHERE id = $4::uuid
            "#,
        )
        .bind(record.request_count)
        .bind(record.rate_limit)
        .bind(record.window_start)
        .bind(&record.id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete_by_user_id(conn: &mut PgConnection, user_id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_rate_limits
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            "Deleted {} rate limit record(s) for user {}",
            result.rows_affected(),
            user_id
        );
        Ok(())
    }

    pub async fn update_rate_limit(
        conn: &mut PgConnection,
        user_id: &str,
        new_rate_limit: i32,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE user_rate_limits
            SET rate_limit = $1
            WHERE user_id = $2
            "#,
        )
        .bind(new_rate_limit)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
