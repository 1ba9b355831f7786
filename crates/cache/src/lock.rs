//! 基于缓存原语的分布式锁
//!
//! 加锁：`SET lock:{resource} {token} NX PX {ttl}`
//! 解锁：只有值仍等于本次令牌时才删除，锁过期后被他人重新获取时不会误删

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use review_errors::AppResult;
use review_ports::{CachePort, DistributedLock, LockToken};
use tracing::{debug, warn};
use uuid::Uuid;

/// 锁键的默认命名空间
pub const LOCK_KEY_PREFIX: &str = "lock:";

/// 缓存分布式锁
#[derive(Clone)]
pub struct CacheLock {
    cache: Arc<dyn CachePort>,
    lock_prefix: String,
}

impl CacheLock {
    pub fn new(cache: Arc<dyn CachePort>) -> Self {
        Self {
            cache,
            lock_prefix: LOCK_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_prefix = prefix.into();
        self
    }

    pub fn lock_key(&self, resource: &str) -> String {
        format!("{}{}", self.lock_prefix, resource)
    }

    /// 尝试加锁并执行 `fut`，未抢到锁时不执行并返回 `Ok(None)`
    pub async fn with_lock<F, T>(&self, resource: &str, ttl: Duration, fut: F) -> AppResult<Option<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        match self.try_acquire(resource, ttl).await? {
            Some(token) => run_locked(self, token, fut).await.map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DistributedLock for CacheLock {
    async fn try_acquire(&self, resource: &str, ttl: Duration) -> AppResult<Option<LockToken>> {
        let key = self.lock_key(resource);
        let value = Uuid::new_v4().to_string();

        if self.cache.set_nx(&key, &value, ttl).await? {
            debug!(lock_key = %key, ttl_ms = ttl.as_millis() as u64, "Lock acquired");
            Ok(Some(LockToken {
                resource: resource.to_string(),
                key,
                value,
            }))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, token: &LockToken) -> AppResult<bool> {
        let released = self.cache.delete_if_equals(&token.key, &token.value).await?;
        if !released {
            warn!(
                lock_key = %token.key,
                "Lock already expired or taken over before release"
            );
        }
        Ok(released)
    }
}

/// 持锁执行 `fut`，无论成功、失败还是 panic 都会释放锁
///
/// 释放失败只记录日志，锁会在 TTL 到期后自行失效
pub async fn run_locked<F, T>(lock: &dyn DistributedLock, token: LockToken, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let outcome = AssertUnwindSafe(fut).catch_unwind().await;

    if let Err(e) = lock.release(&token).await {
        warn!(lock_key = %token.key, error = %e, "Failed to release lock");
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
