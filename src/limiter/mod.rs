//! 限流判定引擎
//!
//! 按用户维护固定窗口计数，缓存层作快速路径，持久层保存权威记录。

pub mod error;
pub mod policy;
pub mod service;

pub use error::{LimiterError, LimiterResult};
pub use policy::{Advance, DEFAULT_RATE_LIMIT, WindowPolicy};
pub use service::{LimiterOptions, RateLimitService, RateStatus, with_deadline};
