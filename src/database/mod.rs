// 数据库模块
// 包含限流记录实体、事务协调与存储库实现

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repositories;
pub mod transaction;

// 重新导出常用类型，方便其他模块使用
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::RateLimitEntity;
pub use postgres::{PgTransactionFactory, run_migrations};
pub use repositories::RateLimitRepository;
pub use transaction::{DbTransaction, TransactionFactory, TransactionHandle, TransactionState};
