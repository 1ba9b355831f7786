//! 分布式锁 trait 定义

use async_trait::async_trait;
use review_errors::AppResult;
use std::time::Duration;

/// 一次成功加锁的凭证
///
/// `value` 是本次加锁写入的随机令牌，释放时只有令牌匹配才会删除锁
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub resource: String,
    pub key: String,
    pub value: String,
}

/// 分布式锁 trait
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// 尝试获取锁（不阻塞），成功返回令牌，已被占用返回 None
    async fn try_acquire(&self, resource: &str, ttl: Duration) -> AppResult<Option<LockToken>>;

    /// 释放锁，返回是否确实删除了自己持有的锁
    async fn release(&self, token: &LockToken) -> AppResult<bool>;
}
