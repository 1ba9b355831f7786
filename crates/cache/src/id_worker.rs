//! 全局唯一 ID 生成
//!
//! `id = (now - epoch_offset) << 32 | sequence`，序列号按 `icr:{prefix}:{yyyyMMdd}` 每日自增

use std::sync::Arc;

use chrono::{DateTime, Utc};
use review_errors::{AppError, AppResult};
use review_ports::CachePort;
use tracing::debug;

use crate::metrics::record_id_generated;

/// 2025-01-01T00:00:00Z
pub const DEFAULT_EPOCH_OFFSET_SECS: i64 = 1_735_689_600;

const SEQUENCE_BITS: u32 = 32;
const SEQUENCE_KEY_PREFIX: &str = "icr:";

/// 基于缓存计数器的 ID 生成器
#[derive(Clone)]
pub struct IdWorker {
    cache: Arc<dyn CachePort>,
    epoch_offset_secs: i64,
}

impl IdWorker {
    pub fn new(cache: Arc<dyn CachePort>) -> Self {
        Self {
            cache,
            epoch_offset_secs: DEFAULT_EPOCH_OFFSET_SECS,
        }
    }

    pub fn with_epoch_offset(mut self, epoch_offset_secs: i64) -> Self {
        self.epoch_offset_secs = epoch_offset_secs;
        self
    }

    /// 生成下一个 ID
    pub async fn next_id(&self, prefix: &str) -> AppResult<u64> {
        self.next_id_at(prefix, Utc::now()).await
    }

    /// 以指定时间生成下一个 ID
    pub async fn next_id_at(&self, prefix: &str, now: DateTime<Utc>) -> AppResult<u64> {
        let elapsed = now.timestamp() - self.epoch_offset_secs;
        let timestamp = u32::try_from(elapsed).map_err(|_| {
            AppError::internal(format!(
                "Clock {} is outside the id range of epoch offset {}",
                now, self.epoch_offset_secs
            ))
        })?;

        let key = sequence_key(prefix, now);
        let count = self.cache.incr(&key).await?;
        let sequence = u32::try_from(count).map_err(|_| {
            AppError::resource_exhausted(format!("Id sequence {} exhausted for {}", count, key))
        })?;

        record_id_generated(prefix);
        debug!(key = %key, sequence, "Id generated");
        Ok((u64::from(timestamp) << SEQUENCE_BITS) | u64::from(sequence))
    }

    /// 拆分 ID 为 (生成时间, 序列号)
    pub fn decompose(&self, id: u64) -> (DateTime<Utc>, u32) {
        let seconds = (id >> SEQUENCE_BITS) as i64 + self.epoch_offset_secs;
        let sequence = (id & u64::from(u32::MAX)) as u32;
        let timestamp = DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
        (timestamp, sequence)
    }
}

fn sequence_key(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}{}:{}", SEQUENCE_KEY_PREFIX, prefix, now.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCache;
    use chrono::TimeZone;

    fn worker() -> (Arc<InMemoryCache>, IdWorker) {
        let cache = Arc::new(InMemoryCache::new());
        (cache.clone(), IdWorker::new(cache))
    }

    #[tokio::test]
    async fn test_id_layout() {
        let (cache, worker) = worker();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 10).unwrap();

        let first = worker.next_id_at("order", now).await.unwrap();
        let second = worker.next_id_at("order", now).await.unwrap();

        assert_eq!(first, (10u64 << 32) | 1);
        assert_eq!(second, (10u64 << 32) | 2);
        assert_eq!(cache.get("icr:order:20250101").await.unwrap(), Some("2".to_string()));
        assert_eq!(worker.decompose(second), (now, 2));
    }

    #[tokio::test]
    async fn test_before_epoch_is_internal_error() {
        let (_cache, worker) = worker();
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert!(matches!(
            worker.next_id_at("order", now).await,
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_sequence_overflow_is_rejected() {
        let (cache, worker) = worker();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        cache
            .set("icr:order:20250301", &u32::MAX.to_string(), None)
            .await
            .unwrap();

        assert!(matches!(
            worker.next_id_at("order", now).await,
            Err(AppError::ResourceExhausted(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_epoch() {
        let (_cache, worker) = worker();
        let worker = worker.with_epoch_offset(0);
        let now = Utc.timestamp_opt(100, 0).unwrap();
        assert_eq!(worker.next_id_at("x", now).await.unwrap(), (100u64 << 32) | 1);
    }
}
