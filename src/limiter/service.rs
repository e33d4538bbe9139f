use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::error::{Context, LimiterError, LimiterResult};
use super::policy::{Advance, DEFAULT_RATE_LIMIT, WindowPolicy};
use crate::cache::{Cache, CacheError, RateLimitCacheOperations};
use crate::config::Config;
use crate::database::{DbTransaction, RateLimitEntity, TransactionFactory};

const MAX_USER_ID_LEN: usize = 255;

/// 限流服务参数
#[derive(Debug, Clone, Copy)]
pub struct LimiterOptions {
    /// 固定窗口长度，同时是缓存条目的 TTL
    pub window: Duration,
    pub default_limit: i32,
    /// 缓存命中时是否同时写回持久层
    pub write_through_on_hit: bool,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(10),
            default_limit: DEFAULT_RATE_LIMIT,
            write_through_on_hit: false,
        }
    }
}

impl From<&Config> for LimiterOptions {
    fn from(config: &Config) -> Self {
        Self {
            window: config.rate_limit_window(),
            default_limit: config.rate_limit_default,
            write_through_on_hit: config.rate_limit_write_through,
        }
    }
}

/// 用户当前的限流状态
///
/// `remaining` 报告的是已用次数而不是剩余次数，保持与既有接口一致。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateStatus {
    pub user_id: String,
    pub limit: i32,
    pub remaining: i32,
    pub window: Duration,
}

/// 限流判定服务
///
/// 缓存层只是快速路径：命中时只更新缓存，未命中时在事务内读写持久层后回填缓存。
/// 两层之间存在不一致窗口，同一用户的并发判定也不做互斥。
pub struct RateLimitService {
    transactions: Arc<dyn TransactionFactory>,
    cache: Arc<dyn Cache>,
    policy: WindowPolicy,
    write_through_on_hit: bool,
}

impl RateLimitService {
    pub fn new(
        transactions: Arc<dyn TransactionFactory>,
        cache: Arc<dyn Cache>,
        options: LimiterOptions,
    ) -> Self {
        Self {
            transactions,
            cache,
            policy: WindowPolicy::new(options.window, options.default_limit),
            write_through_on_hit: options.write_through_on_hit,
        }
    }

    pub fn window(&self) -> Duration {
        self.policy.window()
    }

    /// 判定本次请求是否放行，`explicit_limit` 为 0 表示使用已保存的上限
    pub async fn decide(&self, user_id: &str, explicit_limit: i32) -> LimiterResult<bool> {
        validate_user_id(user_id)?;
        validate_limit("limit", explicit_limit)?;
        let now = Utc::now();

        if let Some(mut record) = self.cached(user_id).await? {
            if self.policy.is_expired(&record, now) {
                debug!("Cached window for {} has expired, falling back to store", user_id);
            } else {
                if self.policy.advance(&mut record, explicit_limit, now) == Advance::Denied {
                    debug!("Denied {} from cache ({} used)", user_id, record.request_count);
                    return Ok(false);
                }
                self.write_back_hit(&record).await?;
                return Ok(true);
            }
        }

        self.decide_from_store(user_id, explicit_limit, now).await
    }

    /// 查询用户状态，缓存优先
    pub async fn get_status(&self, user_id: &str) -> LimiterResult<RateStatus> {
        validate_user_id(user_id)?;

        if let Some(record) = self.cached(user_id).await? {
            return Ok(self.status(record));
        }

        let mut tx = self.begin().await?;
        let result = load(&mut tx, user_id).await;
        let found = finish(&mut tx, result).await?;

        match found {
            Some(record) => Ok(self.status(record)),
            None => Err(LimiterError::NotFound(user_id.to_string())),
        }
    }

    /// 覆盖用户的请求计数
    ///
    /// 注意写入的是 `request_count` 而不是上限字段。提交失败时缓存保持原样。
    pub async fn set_limit(&self, user_id: &str, new_limit: i32) -> LimiterResult<()> {
        validate_user_id(user_id)?;
        validate_limit("new_limit", new_limit)?;

        let mut tx = self.begin().await?;
        let result = self.overwrite_count(&mut tx, user_id, new_limit).await;
        let record = finish(&mut tx, result).await?;

        RateLimitCacheOperations::set_rate_limit(self.cache.as_ref(), &record, self.window())
            .await
            .context("refresh cached rate limit")?;
        info!("Set request count of {} to {}", user_id, new_limit);
        Ok(())
    }

    /// 删除用户的持久记录和缓存镜像，记录不存在时同样成功
    pub async fn remove_limit(&self, user_id: &str) -> LimiterResult<()> {
        validate_user_id(user_id)?;

        let mut tx = self.begin().await?;
        let result = match tx.rate_limits() {
            Ok(repo) => repo.delete_by_user_id(user_id).await,
            Err(e) => Err(e),
        }
        .context("delete rate limit");
        finish(&mut tx, result).await?;

        RateLimitCacheOperations::remove_rate_limit(self.cache.as_ref(), user_id)
            .await
            .context("invalidate cached rate limit")?;
        info!("Removed rate limit for {}", user_id);
        Ok(())
    }

    async fn begin(&self) -> LimiterResult<DbTransaction> {
        self.transactions.begin().await.context("begin transaction")
    }

    /// 读缓存；读取失败时退回持久层，解码失败则直接报错
    async fn cached(&self, user_id: &str) -> LimiterResult<Option<RateLimitEntity>> {
        match RateLimitCacheOperations::get_rate_limit(self.cache.as_ref(), user_id).await {
            Ok(found) => Ok(found),
            Err(e @ CacheError::Decode(_)) => Err(LimiterError::Cache {
                op: "decode cached rate limit",
                source: e,
            }),
            Err(e) => {
                warn!("Cache read for {} failed, falling back to store: {}", user_id, e);
                Ok(None)
            }
        }
    }

    async fn write_back_hit(&self, record: &RateLimitEntity) -> LimiterResult<()> {
        if self.write_through_on_hit && record.is_persisted() {
            let mut tx = self.begin().await?;
            let result = match tx.rate_limits() {
                Ok(repo) => repo.update(record).await,
                Err(e) => Err(e),
            }
            .context("update rate limit");
            finish(&mut tx, result).await?;
        }

        RateLimitCacheOperations::set_rate_limit(self.cache.as_ref(), record, self.window())
            .await
            .context("update cached rate limit")
    }

    async fn decide_from_store(
        &self,
        user_id: &str,
        explicit_limit: i32,
        now: DateTime<Utc>,
    ) -> LimiterResult<bool> {
        let mut tx = self.begin().await?;
        let result = self.advance_stored(&mut tx, user_id, explicit_limit, now).await;
        let admitted = finish(&mut tx, result).await?;

        let Some(record) = admitted else {
            debug!("Denied {} from store", user_id);
            return Ok(false);
        };

        RateLimitCacheOperations::set_rate_limit(self.cache.as_ref(), &record, self.window())
            .await
            .context("populate cached rate limit")?;
        Ok(true)
    }

    /// 放行时返回修改后的记录，拒绝时返回 `None`
    async fn advance_stored(
        &self,
        tx: &mut DbTransaction,
        user_id: &str,
        explicit_limit: i32,
        now: DateTime<Utc>,
    ) -> LimiterResult<Option<RateLimitEntity>> {
        let repo = tx.rate_limits().context("load rate limit")?;
        let existing = repo
            .find_by_user_id(user_id)
            .await
            .context("load rate limit")?;

        let Some(mut record) = existing else {
            let mut record = self.policy.first_record(user_id, explicit_limit, now);
            record.id = repo.create(&record).await.context("create rate limit")?;
            info!(
                "Created rate limit for {} with limit {}",
                user_id, record.rate_limit
            );
            return Ok(Some(record));
        };

        match self.policy.advance(&mut record, explicit_limit, now) {
            Advance::Denied => Ok(None),
            advance => {
                if advance == Advance::Reset {
                    debug!("Window for {} expired, counter reset", user_id);
                }
                repo.update(&record).await.context("update rate limit")?;
                Ok(Some(record))
            }
        }
    }

    async fn overwrite_count(
        &self,
        tx: &mut DbTransaction,
        user_id: &str,
        new_count: i32,
    ) -> LimiterResult<RateLimitEntity> {
        let repo = tx.rate_limits().context("load rate limit")?;
        let existing = repo
            .find_by_user_id(user_id)
            .await
            .context("load rate limit")?;

        match existing {
            Some(mut record) => {
                record.request_count = new_count;
                repo.update(&record).await.context("update rate limit")?;
                Ok(record)
            }
            None => {
                // 新建记录的上限字段留空为 0，之后不带显式上限的判定都会被拒绝
                let mut record = RateLimitEntity::new(user_id, new_count, 0, Utc::now());
                record.id = repo.create(&record).await.context("create rate limit")?;
                Ok(record)
            }
        }
    }

    fn status(&self, record: RateLimitEntity) -> RateStatus {
        RateStatus {
            user_id: record.user_id,
            limit: record.rate_limit,
            remaining: record.request_count,
            window: self.window(),
        }
    }
}

/// 在截止时间内执行一次服务调用
///
/// 超时会丢弃进行中的调用，其中未提交的事务随之回滚。
pub async fn with_deadline<T, F>(deadline: Duration, op: &'static str, fut: F) -> LimiterResult<T>
where
    F: Future<Output = LimiterResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Deadline of {:?} exceeded while trying to {}", deadline, op);
            Err(LimiterError::Timeout { op })
        }
    }
}

async fn load(tx: &mut DbTransaction, user_id: &str) -> LimiterResult<Option<RateLimitEntity>> {
    let repo = tx.rate_limits().context("load rate limit")?;
    repo.find_by_user_id(user_id).await.context("load rate limit")
}

/// 成功时提交，无论结果如何最后都调用 `rollback_unless_committed`
async fn finish<T>(tx: &mut DbTransaction, result: LimiterResult<T>) -> LimiterResult<T> {
    let result = match result {
        Ok(value) => tx
            .commit()
            .await
            .context("commit transaction")
            .map(|()| value),
        Err(e) => Err(e),
    };
    tx.rollback_unless_committed().await;
    result
}

fn validate_user_id(user_id: &str) -> LimiterResult<()> {
    if user_id.trim().is_empty() {
        return Err(LimiterError::Validation("user_id must not be empty".into()));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(LimiterError::Validation(format!(
            "user_id must be at most {} bytes",
            MAX_USER_ID_LEN
        )));
    }
    Ok(())
}

fn validate_limit(field: &str, value: i32) -> LimiterResult<()> {
    if value < 0 {
        return Err(LimiterError::Validation(format!(
            "{} must not be negative",
            field
        )));
    }
    Ok(())
}
