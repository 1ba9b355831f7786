//! 逻辑过期策略
//!
//! 数据以信封形式常驻缓存，不设物理 TTL。过期只由 `expire_at` 判断：
//! 过期后立即返回旧值，抢到重建锁的调用方把重建提交给后台执行器。
//! 记录不存在的信封例外，带 `null_ttl` 加抖动的物理 TTL

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use review_errors::AppResult;
use review_ports::{CachePort, DistributedLock, LockToken, RecordStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CacheOptions, CacheReadStrategy};
use crate::executor::RebuildExecutor;
use crate::jitter::TtlJitter;
use crate::keys::KeySpace;
use crate::lock::{CacheLock, run_locked};
use crate::metrics::{record_read, record_rebuild};

const STRATEGY: &str = "logical";

/// 带逻辑过期时间的缓存值
///
/// `data` 为 None 表示记录不存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalExpiryEnvelope<T> {
    pub data: Option<T>,
    pub expire_at: DateTime<Utc>,
}

impl<T> LogicalExpiryEnvelope<T> {
    pub fn new(data: Option<T>, expire_at: DateTime<Utc>) -> Self {
        Self { data, expire_at }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }
}

fn expire_after(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

struct Inner<T> {
    cache: Arc<dyn CachePort>,
    store: Arc<dyn RecordStore<T>>,
    lock: CacheLock,
    keys: KeySpace,
    options: CacheOptions,
    null_jitter: TtlJitter,
}

impl<T> Inner<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read_envelope(&self, key: &str) -> AppResult<Option<LogicalExpiryEnvelope<T>>> {
        let Some(payload) = self.cache.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed cache envelope, treating as miss");
                Ok(None)
            }
        }
    }

    /// 有数据的信封不过期，空信封按空标记 TTL 物理过期
    async fn write_envelope(&self, key: &str, envelope: &LogicalExpiryEnvelope<T>) -> AppResult<()> {
        let payload = serde_json::to_string(envelope)?;
        let ttl = match envelope.data {
            Some(_) => None,
            None => Some(self.null_jitter.apply(self.options.null_ttl)),
        };
        self.cache.set(key, &payload, ttl).await
    }

    /// 回源并写入新的信封，缓存写入失败只记录日志
    async fn load(&self, id: i64) -> AppResult<Option<T>> {
        let key = self.keys.cache_key(id);
        let record = match self.store.get_by_id(id).await {
            Ok(record) => record,
            Err(e) => {
                record_rebuild(STRATEGY, false);
                return Err(e);
            }
        };

        let expire_at = expire_after(self.options.logical_ttl);
        let envelope = LogicalExpiryEnvelope::new(record, expire_at);
        if let Err(e) = self.write_envelope(&key, &envelope).await {
            warn!(key = %key, error = %e, "Failed to write cache envelope");
        }

        record_rebuild(STRATEGY, true);
        info!(key = %key, found = envelope.data.is_some(), %expire_at, "Cache envelope rebuilt");
        Ok(envelope.data)
    }

    /// 后台重建，持锁后若信封已被刷新则跳过
    async fn refresh(&self, id: i64) -> AppResult<()> {
        let key = self.keys.cache_key(id);
        let fresh = self
            .read_envelope(&key)
            .await?
            .is_some_and(|envelope| !envelope.is_expired_at(Utc::now()));
        if fresh {
            debug!(key = %key, "Envelope already refreshed, skipping rebuild");
            return Ok(());
        }
        self.load(id).await.map(|_| ())
    }
}

/// 逻辑过期旁路缓存
pub struct LogicalExpireStrategy<T> {
    inner: Arc<Inner<T>>,
    executor: Arc<RebuildExecutor>,
}

impl<T> LogicalExpireStrategy<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        cache: Arc<dyn CachePort>,
        store: Arc<dyn RecordStore<T>>,
        keys: KeySpace,
        options: CacheOptions,
        executor: Arc<RebuildExecutor>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                lock: CacheLock::new(cache.clone()),
                null_jitter: TtlJitter::new(options.null_jitter),
                cache,
                store,
                keys,
                options,
            }),
            executor,
        }
    }

    /// 预热单条记录
    pub async fn warm(&self, id: i64) -> AppResult<()> {
        self.inner.load(id).await.map(|_| ())
    }

    /// 批量预热，单条失败只记录日志，返回成功条数
    pub async fn warm_all(&self, ids: &[i64]) -> usize {
        let mut warmed = 0;
        for &id in ids {
            match self.warm(id).await {
                Ok(()) => warmed += 1,
                Err(e) => warn!(id, error = %e, "Failed to warm cache entry"),
            }
        }
        info!(requested = ids.len(), warmed, "Cache warm-up finished");
        warmed
    }

    /// 直接写入指定过期时间的信封
    pub async fn set_with_logical_expire(
        &self,
        id: i64,
        data: Option<T>,
        expire_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let key = self.inner.keys.cache_key(id);
        self.inner
            .write_envelope(&key, &LogicalExpiryEnvelope::new(data, expire_at))
            .await
    }

    /// 非阻塞抢锁，抢到后提交后台重建
    async fn schedule_refresh(&self, id: i64) {
        let resource = self.inner.keys.lock_resource(id);
        let token = match self
            .inner
            .lock
            .try_acquire(&resource, self.inner.options.lock_ttl)
            .await
        {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(resource = %resource, "Rebuild already in progress");
                return;
            }
            Err(e) => {
                warn!(resource = %resource, error = %e, "Failed to acquire rebuild lock");
                return;
            }
        };

        let inner = self.inner.clone();
        let job_token = token.clone();
        let job = async move {
            let lock = inner.lock.clone();
            run_locked(&lock, job_token, inner.refresh(id)).await
        }
        .boxed();

        if let Err(e) = self.executor.submit(resource, job) {
            warn!(error = %e, "Failed to schedule cache rebuild");
            self.release(&token).await;
        }
    }

    async fn release(&self, token: &LockToken) {
        if let Err(e) = self.inner.lock.release(token).await {
            warn!(lock_key = %token.key, error = %e, "Failed to release lock");
        }
    }
}

#[async_trait]
impl<T> CacheReadStrategy<T> for LogicalExpireStrategy<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, id: i64) -> AppResult<Option<T>> {
        let key = self.inner.keys.cache_key(id);

        let Some(envelope) = self.inner.read_envelope(&key).await? else {
            debug!(key = %key, "Cache miss, loading synchronously");
            record_read(STRATEGY, "miss");
            return self.inner.load(id).await;
        };

        if !envelope.is_expired_at(Utc::now()) {
            debug!(key = %key, "Cache hit");
            record_read(STRATEGY, "hit");
            return Ok(envelope.data);
        }

        debug!(key = %key, expire_at = %envelope.expire_at, "Cache entry stale");
        record_read(STRATEGY, "stale");
        self.schedule_refresh(id).await;
        Ok(envelope.data)
    }
}
