//! 旁路缓存读策略
//!
//! - [`MutexCacheStrategy`]: 未命中时互斥重建，空值写入短 TTL 的空标记
//! - [`LogicalExpireStrategy`]: 数据常驻缓存，过期后先返回旧值再后台重建

mod logical;
mod mutex;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use review_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub use logical::{LogicalExpireStrategy, LogicalExpiryEnvelope};
pub use mutex::MutexCacheStrategy;

/// 按 ID 读取实体，缓存不一致时由实现负责回源
#[async_trait]
pub trait CacheReadStrategy<T>: Send + Sync {
    /// 记录不存在时返回 `Ok(None)`
    async fn get(&self, id: i64) -> AppResult<Option<T>>;
}

/// 策略选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategyKind {
    #[default]
    Mutex,
    Logical,
}

impl CacheStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mutex => "mutex",
            Self::Logical => "logical",
        }
    }
}

impl FromStr for CacheStrategyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mutex" => Ok(Self::Mutex),
            "logical" => Ok(Self::Logical),
            other => Err(AppError::validation(format!(
                "Unknown cache strategy: {} (expected mutex or logical)",
                other
            ))),
        }
    }
}

/// 读策略参数
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// 正常值的基础 TTL
    pub ttl: Duration,
    /// 空标记的基础 TTL
    pub null_ttl: Duration,
    /// 正常值 TTL 的随机抖动上限
    pub jitter: Duration,
    /// 空标记 TTL 的随机抖动上限
    pub null_jitter: Duration,
    /// 重建锁的 TTL
    pub lock_ttl: Duration,
    /// 抢锁失败后的等待间隔
    pub retry_delay: Duration,
    /// 抢锁失败的最大重试次数
    pub max_retries: u32,
    /// 抢锁的最长总等待时间
    pub max_wait: Duration,
    /// 逻辑过期时长
    pub logical_ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            null_ttl: Duration::from_secs(2 * 60),
            jitter: Duration::from_secs(10 * 60),
            null_jitter: Duration::from_secs(60),
            lock_ttl: Duration::from_secs(10),
            retry_delay: Duration::from_millis(50),
            max_retries: 100,
            max_wait: Duration::from_secs(5),
            logical_ttl: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy_kind() {
        assert_eq!("mutex".parse::<CacheStrategyKind>().unwrap(), CacheStrategyKind::Mutex);
        assert_eq!(" Logical ".parse::<CacheStrategyKind>().unwrap(), CacheStrategyKind::Logical);
        assert_eq!(CacheStrategyKind::Logical.as_str(), "logical");
    }

    #[test]
    fn test_unknown_strategy_is_validation_error() {
        let result = "write-through".parse::<CacheStrategyKind>();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
