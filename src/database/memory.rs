use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::error::{StoreError, StoreResult};
use crate::database::models::RateLimitEntity;
use crate::database::repositories::RateLimitRepository;
use crate::database::transaction::{DbTransaction, TransactionFactory, TransactionHandle};

#[derive(Default)]
struct Inner {
    // id -> record
    records: Mutex<HashMap<String, RateLimitEntity>>,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// 内存持久层
///
/// 事务内的写入先进入暂存区，提交时才落到共享表中；
/// 句柄被丢弃或回滚时暂存区直接丢弃。
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, HashMap<String, RateLimitEntity>>> {
        lock_records(&self.inner)
    }

    /// 直接读取已提交的记录
    pub fn get(&self, user_id: &str) -> Option<RateLimitEntity> {
        let records = self.records().ok()?;
        records.values().find(|r| r.user_id == user_id).cloned()
    }

    /// 绕过事务写入一条记录，返回其主键
    pub fn insert(&self, mut record: RateLimitEntity) -> String {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        if let Ok(mut records) = self.records() {
            records.insert(id.clone(), record);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn begins(&self) -> usize {
        self.inner.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    /// 开启事务并直接返回作用域守卫
    pub async fn transaction(&self) -> StoreResult<DbTransaction> {
        self.begin().await
    }
}

fn lock_records(inner: &Inner) -> StoreResult<MutexGuard<'_, HashMap<String, RateLimitEntity>>> {
    inner
        .records
        .lock()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
}

#[async_trait]
impl TransactionFactory for MemoryStore {
    async fn begin_handle(&self) -> StoreResult<Box<dyn TransactionHandle>> {
        self.inner.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            staged: HashMap::new(),
        }))
    }
}

/// 内存事务，`staged` 中 `None` 表示删除
pub struct MemoryTransaction {
    inner: Arc<Inner>,
    staged: HashMap<String, Option<RateLimitEntity>>,
}

impl MemoryTransaction {
    /// 事务视角下的全部记录：已提交的数据叠加暂存区
    fn visible(&self) -> StoreResult<Vec<RateLimitEntity>> {
        let records = lock_records(&self.inner)?;
        let mut view: HashMap<String, RateLimitEntity> = records.clone();
        drop(records);

        for (id, staged) in &self.staged {
            match staged {
                Some(record) => {
                    view.insert(id.clone(), record.clone());
                }
                None => {
                    view.remove(id);
                }
            }
        }
        Ok(view.into_values().collect())
    }
}

#[async_trait]
impl TransactionHandle for MemoryTransaction {
    fn rate_limits(&mut self) -> &mut dyn RateLimitRepository {
        self
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut records = lock_records(&self.inner)?;
        for (id, staged) in self.staged.iter() {
            match staged {
                Some(record) => {
                    records.insert(id.clone(), record.clone());
                }
                None => {
                    records.remove(id);
                }
            }
        }
        drop(records);
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RateLimitRepository for MemoryTransaction {
    async fn create(&mut self, record: &RateLimitEntity) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut record = record.clone();
        record.id = id.clone();
        self.staged.insert(id.clone(), Some(record));
        Ok(id)
    }

    async fn find_by_user_id(&mut self, user_id: &str) -> StoreResult<Option<RateLimitEntity>> {
        Ok(self.visible()?.into_iter().find(|r| r.user_id == user_id))
    }

    async fn update(&mut self, record: &RateLimitEntity) -> StoreResult<()> {
        // 与 UPDATE ... WHERE id = ? 一致，主键不存在时不影响任何行
        let exists = self.visible()?.iter().any(|r| r.id == record.id);
        if exists {
            self.staged.insert(record.id.clone(), Some(record.clone()));
        }
        Ok(())
    }

    async fn delete_by_user_id(&mut self, user_id: &str) -> StoreResult<()> {
        let ids: Vec<String> = self
            .visible()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect();
        for id in ids {
            self.staged.insert(id, None);
        }
        Ok(())
    }

    async fn update_rate_limit(&mut self, user_id: &str, new_rate_limit: i32) -> StoreResult<()> {
        let matching: Vec<RateLimitEntity> = self
            .visible()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        for mut record in matching {
            record.rate_limit = new_rate_limit;
            self.staged.insert(record.id.clone(), Some(record));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::database::transaction::TransactionState;

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let store = MemoryStore::new();
        let mut tx = store.transaction().await.unwrap();
        let id = tx
            .rate_limits()
            .unwrap()
            .create(&RateLimitEntity::new("alice", 1, 100, Utc::now()))
            .await
            .unwrap();

        assert!(store.get("alice").is_none());
        tx.commit().await.unwrap();

        let stored = store.get("alice").unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.request_count, 1);
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn reads_inside_transaction_see_staged_writes() {
        let store = MemoryStore::new();
        let mut tx = store.transaction().await.unwrap();
        let repo = tx.rate_limits().unwrap();
        repo.create(&RateLimitEntity::new("bob", 3, 10, Utc::now()))
            .await
            .unwrap();

        let found = repo.find_by_user_id("bob").await.unwrap().unwrap();
        assert_eq!(found.request_count, 3);
        tx.rollback().await.unwrap();
        assert!(store.get("bob").is_none());
    }

    #[tokio::test]
    async fn rollback_unless_committed_is_a_no_op_after_commit() {
        let store = MemoryStore::new();
        let mut tx = store.transaction().await.unwrap();
        tx.commit().await.unwrap();
        tx.rollback_unless_committed().await;

        assert_eq!(tx.state(), TransactionState::Committed);
        assert!(tx.is_committed());
        assert_eq!(store.commits(), 1);
        assert_eq!(store.rollbacks(), 0);
    }

    #[tokio::test]
    async fn rollback_unless_committed_discards_open_writes() {
        let store = MemoryStore::new();
        let mut tx = store.transaction().await.unwrap();
        tx.rate_limits()
            .unwrap()
            .create(&RateLimitEntity::new("carol", 1, 5, Utc::now()))
            .await
            .unwrap();
        tx.rollback_unless_committed().await;
        tx.rollback_unless_committed().await;

        assert_eq!(tx.state(), TransactionState::RolledBack);
        assert!(!tx.is_committed());
        assert_eq!(store.rollbacks(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn finished_transaction_rejects_further_use() {
        let store = MemoryStore::new();
        let mut tx = store.transaction().await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(tx.rate_limits(), Err(StoreError::NoTransaction)));
        assert!(matches!(tx.commit().await, Err(StoreError::NoTransaction)));
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_store_untouched() {
        let store = MemoryStore::new();
        {
            let mut tx = store.transaction().await.unwrap();
            tx.rate_limits()
                .unwrap()
                .create(&RateLimitEntity::new("dave", 1, 5, Utc::now()))
                .await
                .unwrap();
        }
        assert!(store.is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn update_only_touches_existing_ids() {
        let store = MemoryStore::new();
        let id = store.insert(RateLimitEntity::new("erin", 2, 5, Utc::now()));

        let mut tx = store.transaction().await.unwrap();
        let repo = tx.rate_limits().unwrap();
        let mut record = repo.find_by_user_id("erin").await.unwrap().unwrap();
        record.request_count = 4;
        repo.update(&record).await.unwrap();

        let mut ghost = RateLimitEntity::new("ghost", 1, 1, Utc::now());
        ghost.id = "missing".into();
        repo.update(&ghost).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get("erin").unwrap().id, id);
        assert_eq!(store.get("erin").unwrap().request_count, 4);
        assert!(store.get("ghost").is_none());
    }

    #[tokio::test]
    async fn delete_and_ceiling_update() {
        let store = MemoryStore::new();
        store.insert(RateLimitEntity::new("frank", 2, 5, Utc::now()));
        store.insert(RateLimitEntity::new("grace", 2, 5, Utc::now()));

        let mut tx = store.transaction().await.unwrap();
        let repo = tx.rate_limits().unwrap();
        repo.update_rate_limit("grace", 50).await.unwrap();
        repo.delete_by_user_id("frank").await.unwrap();
        assert!(repo.find_by_user_id("frank").await.unwrap().is_none());
        tx.commit().await.unwrap();

        assert!(store.get("frank").is_none());
        let grace = store.get("grace").unwrap();
        assert_eq!(grace.rate_limit, 50);
        assert_eq!(grace.request_count, 2);
    }
}
