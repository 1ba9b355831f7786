//! 每日签到
//!
//! 每个用户每月一个位图 `sign:{userId}:{yyyyMM}`，第 N 天对应第 N-1 位

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use metrics::counter;
use review_errors::AppResult;
use review_ports::CachePort;
use tracing::debug;

pub fn sign_key(user_id: i64, date: NaiveDate) -> String {
    format!("sign:{}:{}", user_id, date.format("%Y%m"))
}

pub struct SignService {
    cache: Arc<dyn CachePort>,
}

impl SignService {
    pub fn new(cache: Arc<dyn CachePort>) -> Self {
        Self { cache }
    }

    /// 签到，重复签到不报错
    pub async fn sign(&self, user_id: i64, date: NaiveDate) -> AppResult<()> {
        let offset = u64::from(date.day0());
        let already = self
            .cache
            .set_bit(&sign_key(user_id, date), offset, true)
            .await?;
        if !already {
            counter!("sign_total").increment(1);
        }
        debug!(user_id, %date, already, "User signed");
        Ok(())
    }

    pub async fn is_signed(&self, user_id: i64, date: NaiveDate) -> AppResult<bool> {
        self.cache
            .get_bit(&sign_key(user_id, date), u64::from(date.day0()))
            .await
    }

    /// 截至 `date` 当天的连续签到天数，当天未签到为 0
    pub async fn sign_count(&self, user_id: i64, date: NaiveDate) -> AppResult<u32> {
        // 月内天数不超过 31，按 u{day} 读取从月初到当天的位
        let bits = date.day() as u8;
        let value = self
            .cache
            .bitfield_get_unsigned(&sign_key(user_id, date), bits, 0)
            .await?;
        Ok(value.trailing_ones())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_key_uses_year_month() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(sign_key(42, date), "sign:42:202503");
    }
}
