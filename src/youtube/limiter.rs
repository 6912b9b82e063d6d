//! 翻訳投稿のレート制限
//!
//! YouTube Data APIのクォータを守るための2つの上限を持つ。
//! 前回投稿からの最小間隔と、1日あたりの投稿数上限。日付が変わると
//! 日次カウンターはリセットされる。

use std::time::{Duration, Instant};

use chrono::NaiveDate;

/// 投稿レートリミッター
#[derive(Debug)]
pub struct PostRateLimiter {
    min_interval: Duration,
    daily_limit: u32,
    last_post: Option<Instant>,
    today: Option<NaiveDate>,
    posts_today: u32,
}

impl PostRateLimiter {
    pub fn new(min_interval: Duration, daily_limit: u32) -> Self {
        Self {
            min_interval,
            daily_limit,
            last_post: None,
            today: None,
            posts_today: 0,
        }
    }

    /// 投稿してよければ `true` を返し、内部カウンターを進める
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now(), chrono::Local::now().date_naive())
    }

    /// 時刻を注入できる内部実装（テスト用）
    fn try_acquire_at(&mut self, now: Instant, date: NaiveDate) -> bool {
        // 日付が変わったら日次カウンターをリセット
        if self.today != Some(date) {
            self.today = Some(date);
            self.posts_today = 0;
        }

        if self.posts_today >= self.daily_limit {
            tracing::warn!(
                "1日の投稿上限 ({}) に達したため投稿をスキップします",
                self.daily_limit
            );
            return false;
        }

        if let Some(last) = self.last_post {
            if now.duration_since(last) < self.min_interval {
                tracing::debug!("投稿間隔が最小間隔未満のためスキップします");
                return false;
            }
        }

        self.last_post = Some(now);
        self.posts_today += 1;
        true
    }

    /// 本日の投稿数
    pub fn posts_today(&self) -> u32 {
        self.posts_today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_first_post_is_allowed() {
        let mut limiter = PostRateLimiter::new(Duration::from_secs(30), 10);
        assert!(limiter.try_acquire_at(Instant::now(), date(1)));
        assert_eq!(limiter.posts_today(), 1);
    }

    #[test]
    fn test_min_interval_is_enforced() {
        let mut limiter = PostRateLimiter::new(Duration::from_secs(30), 10);
        let t0 = Instant::now();

        assert!(limiter.try_acquire_at(t0, date(1)));
        // 間隔不足
        assert!(!limiter.try_acquire_at(t0 + Duration::from_secs(10), date(1)));
        // 間隔経過後はOK
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(31), date(1)));
    }

    #[test]
    fn test_daily_limit_is_enforced() {
        let mut limiter = PostRateLimiter::new(Duration::from_secs(0), 2);
        let t0 = Instant::now();

        assert!(limiter.try_acquire_at(t0, date(1)));
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(1), date(1)));
        assert!(!limiter.try_acquire_at(t0 + Duration::from_secs(2), date(1)));
    }

    #[test]
    fn test_daily_counter_resets_on_new_date() {
        let mut limiter = PostRateLimiter::new(Duration::from_secs(0), 1);
        let t0 = Instant::now();

        assert!(limiter.try_acquire_at(t0, date(1)));
        assert!(!limiter.try_acquire_at(t0 + Duration::from_secs(1), date(1)));
        // 翌日になればカウンターはリセットされる
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(2), date(2)));
        assert_eq!(limiter.posts_today(), 1);
    }
}
