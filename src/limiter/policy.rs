use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::database::models::RateLimitEntity;

/// 未指定上限且没有记录时使用的默认上限
pub const DEFAULT_RATE_LIMIT: i32 = 100;

/// 一次判定对计数器的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 计数已达上限，记录未被修改
    Denied,
    /// 计数加一
    Incremented,
    /// 窗口过期，计数重置为 1、窗口起点移到现在
    Reset,
}

impl Advance {
    pub fn admitted(self) -> bool {
        !matches!(self, Advance::Denied)
    }
}

/// 固定窗口计数策略
///
/// 读取-修改-写回的计数更新集中在 [`advance`](Self::advance)，
/// 两层存储都通过它修改计数。
#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    window: Duration,
    default_limit: i32,
}

impl WindowPolicy {
    pub fn new(window: Duration, default_limit: i32) -> Self {
        Self {
            window,
            default_limit,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 显式上限非 0 时优先，否则使用记录中的上限
    pub fn effective_limit(explicit_limit: i32, stored_limit: i32) -> i32 {
        if explicit_limit != 0 {
            explicit_limit
        } else {
            stored_limit
        }
    }

    /// `now - window_start > window` 时窗口过期，恰好等于窗口长度不算过期
    pub fn is_expired(&self, record: &RateLimitEntity, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(record.window_start);
        match chrono::Duration::from_std(self.window) {
            Ok(window) => elapsed > window,
            Err(_) => false,
        }
    }

    /// 用户第一次出现时的新记录
    pub fn first_record(&self, user_id: &str, explicit_limit: i32, now: DateTime<Utc>) -> RateLimitEntity {
        let limit = Self::effective_limit(explicit_limit, self.default_limit);
        RateLimitEntity::new(user_id, 1, limit, now)
    }

    /// 对已有记录做一次判定并就地修改
    pub fn advance(
        &self,
        record: &mut RateLimitEntity,
        explicit_limit: i32,
        now: DateTime<Utc>,
    ) -> Advance {
        if self.is_expired(record, now) {
            record.request_count = 1;
            record.window_start = now;
            return Advance::Reset;
        }

        let limit = Self::effective_limit(explicit_limit, record.rate_limit);
        if record.request_count >= limit {
            return Advance::Denied;
        }

        record.request_count += 1;
        Advance::Incremented
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn policy() -> WindowPolicy {
        WindowPolicy::new(Duration::from_secs(10), DEFAULT_RATE_LIMIT)
    }

    fn record(count: i32, limit: i32, age_secs: i64) -> (RateLimitEntity, DateTime<Utc>) {
        let now = Utc::now();
        let start = now - ChronoDuration::seconds(age_secs);
        (RateLimitEntity::new("u", count, limit, start), now)
    }

    #[test]
    fn explicit_limit_wins_over_stored() {
        assert_eq!(WindowPolicy::effective_limit(2, 5), 2);
        assert_eq!(WindowPolicy::effective_limit(0, 5), 5);
        assert_eq!(WindowPolicy::effective_limit(50, 5), 50);
    }

    #[test]
    fn first_record_uses_default_or_explicit_limit() {
        let now = Utc::now();
        let first = policy().first_record("u", 0, now);
        assert_eq!(first.request_count, 1);
        assert_eq!(first.rate_limit, 100);
        assert_eq!(first.window_start, now);

        assert_eq!(policy().first_record("u", 7, now).rate_limit, 7);
    }

    #[test]
    fn boundary_request_is_denied() {
        let (mut r, now) = record(5, 5, 1);
        assert_eq!(policy().advance(&mut r, 0, now), Advance::Denied);
        assert_eq!(r.request_count, 5);
    }

    #[test]
    fn below_limit_increments() {
        let (mut r, now) = record(8, 10, 1);
        assert_eq!(policy().advance(&mut r, 0, now), Advance::Incremented);
        assert_eq!(r.request_count, 9);
    }

    #[test]
    fn explicit_limit_denies_regardless_of_stored_limit() {
        let (mut r, now) = record(2, 5, 1);
        assert_eq!(policy().advance(&mut r, 2, now), Advance::Denied);
        assert_eq!(r.rate_limit, 5);
    }

    #[test]
    fn expired_window_resets_even_when_over_limit() {
        let (mut r, now) = record(9, 10, 20);
        assert_eq!(policy().advance(&mut r, 0, now), Advance::Reset);
        assert_eq!(r.request_count, 1);
        assert_eq!(r.window_start, now);
        assert_eq!(r.rate_limit, 10);

        let (mut r, now) = record(500, 10, 20);
        assert!(policy().advance(&mut r, 1, now).admitted());
    }

    #[test]
    fn window_of_exact_length_is_not_expired() {
        let now = Utc::now();
        let r = RateLimitEntity::new("u", 1, 1, now - ChronoDuration::seconds(10));
        assert!(!policy().is_expired(&r, now));
        assert!(policy().is_expired(&r, now + ChronoDuration::milliseconds(1)));
    }
}
