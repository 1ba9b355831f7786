//! 互斥重建策略
//!
//! 未命中时只有一个调用方持锁回源，其余调用方按固定间隔重读缓存

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use review_errors::{AppError, AppResult};
use review_ports::{CachePort, DistributedLock, RecordStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{CacheOptions, CacheReadStrategy};
use crate::jitter::TtlJitter;
use crate::keys::KeySpace;
use crate::lock::{CacheLock, run_locked};
use crate::metrics::{record_read, record_rebuild};

const STRATEGY: &str = "mutex";

/// 空标记，区别于键不存在
const ABSENT_MARKER: &str = "";

enum Lookup<T> {
    Hit(T),
    Absent,
    Miss,
}

/// 互斥锁旁路缓存
pub struct MutexCacheStrategy<T> {
    cache: Arc<dyn CachePort>,
    store: Arc<dyn RecordStore<T>>,
    lock: CacheLock,
    keys: KeySpace,
    options: CacheOptions,
    ttl_jitter: TtlJitter,
    null_jitter: TtlJitter,
}

impl<T> MutexCacheStrategy<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        cache: Arc<dyn CachePort>,
        store: Arc<dyn RecordStore<T>>,
        keys: KeySpace,
        options: CacheOptions,
    ) -> Self {
        Self {
            lock: CacheLock::new(cache.clone()),
            ttl_jitter: TtlJitter::new(options.jitter),
            null_jitter: TtlJitter::new(options.null_jitter),
            cache,
            store,
            keys,
            options,
        }
    }

    /// 替换重建锁（例如使用不同的锁前缀）
    pub fn with_lock(mut self, lock: CacheLock) -> Self {
        self.lock = lock;
        self
    }

    async fn lookup(&self, key: &str) -> AppResult<Lookup<T>> {
        let Some(payload) = self.cache.get(key).await? else {
            return Ok(Lookup::Miss);
        };
        if payload == ABSENT_MARKER {
            return Ok(Lookup::Absent);
        }

        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Lookup::Hit(value)),
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed cache payload, treating as miss");
                Ok(Lookup::Miss)
            }
        }
    }

    async fn rebuild(&self, id: i64, key: &str) -> AppResult<Option<T>> {
        // 等锁期间可能已被其他持锁者写入
        match self.lookup(key).await? {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Absent => return Ok(None),
            Lookup::Miss => {}
        }

        let record = match self.store.get_by_id(id).await {
            Ok(record) => record,
            Err(e) => {
                record_rebuild(STRATEGY, false);
                return Err(e);
            }
        };

        match &record {
            Some(value) => match serde_json::to_string(value) {
                Ok(payload) => {
                    let ttl = self.ttl_jitter.apply(self.options.ttl);
                    self.write(key, &payload, ttl).await;
                }
                Err(e) => warn!(key = %key, error = %e, "Failed to serialize record for cache"),
            },
            None => {
                let ttl = self.null_jitter.apply(self.options.null_ttl);
                self.write(key, ABSENT_MARKER, ttl).await;
            }
        }

        record_rebuild(STRATEGY, true);
        info!(key = %key, found = record.is_some(), "Cache rebuilt");
        Ok(record)
    }

    async fn write(&self, key: &str, payload: &str, ttl: std::time::Duration) {
        if let Err(e) = self.cache.set(key, payload, Some(ttl)).await {
            warn!(key = %key, error = %e, "Failed to write rebuilt cache entry");
        }
    }
}

#[async_trait]
impl<T> CacheReadStrategy<T> for MutexCacheStrategy<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, id: i64) -> AppResult<Option<T>> {
        let key = self.keys.cache_key(id);
        let resource = self.keys.lock_resource(id);
        let started = Instant::now();
        let mut retries = 0u32;

        loop {
            match self.lookup(&key).await? {
                Lookup::Hit(value) => {
                    debug!(key = %key, "Cache hit");
                    record_read(STRATEGY, "hit");
                    return Ok(Some(value));
                }
                Lookup::Absent => {
                    debug!(key = %key, "Cache hit on absent marker");
                    record_read(STRATEGY, "absent");
                    return Ok(None);
                }
                Lookup::Miss => {}
            }

            if let Some(token) = self.lock.try_acquire(&resource, self.options.lock_ttl).await? {
                debug!(key = %key, retries, "Cache miss, rebuilding");
                record_read(STRATEGY, "miss");
                return run_locked(&self.lock, token, self.rebuild(id, &key)).await;
            }

            retries += 1;
            let waited = started.elapsed();
            if retries > self.options.max_retries
                || waited + self.options.retry_delay > self.options.max_wait
            {
                warn!(
                    key = %key,
                    retries,
                    waited_ms = waited.as_millis() as u64,
                    "Gave up waiting for cache rebuild"
                );
                return Err(AppError::timeout(format!(
                    "Timed out waiting for cache rebuild of {}",
                    key
                )));
            }

            tokio::time::sleep(self.options.retry_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryCache, InMemoryRecordStore};
    use review_ports::Identified;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: Option<i64>,
        name: String,
    }

    impl Identified for Item {
        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    fn options() -> CacheOptions {
        CacheOptions {
            jitter: Duration::ZERO,
            null_jitter: Duration::ZERO,
            retry_delay: Duration::from_millis(5),
            max_retries: 10,
            max_wait: Duration::from_millis(200),
            ..CacheOptions::default()
        }
    }

    fn setup() -> (
        Arc<InMemoryCache>,
        Arc<InMemoryRecordStore<Item>>,
        MutexCacheStrategy<Item>,
    ) {
        let cache = Arc::new(InMemoryCache::new());
        let store = Arc::new(InMemoryRecordStore::new());
        let strategy = MutexCacheStrategy::new(
            cache.clone(),
            store.clone(),
            KeySpace::for_entity("item"),
            options(),
        );
        (cache, store, strategy)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, store, strategy) = setup();
        store.insert(Item {
            id: Some(1),
            name: "tea".into(),
        });

        let first = strategy.get(1).await.unwrap().unwrap();
        let second = strategy.get(1).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.get_calls(), 1);
        assert!(cache.ttl("cache:item:1").is_some());
        assert!(!cache.exists("lock:item:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_absent_marker() {
        let (cache, store, strategy) = setup();

        assert_eq!(strategy.get(9).await.unwrap(), None);
        assert_eq!(cache.get("cache:item:9").await.unwrap(), Some(String::new()));
        assert_eq!(strategy.get(9).await.unwrap(), None);
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_miss() {
        let (cache, store, strategy) = setup();
        store.insert(Item {
            id: Some(2),
            name: "cake".into(),
        });
        cache.set("cache:item:2", "{not json", None).await.unwrap();

        let item = strategy.get(2).await.unwrap().unwrap();
        assert_eq!(item.name, "cake");
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_store_error_propagates_and_releases_lock() {
        let (cache, store, strategy) = setup();
        store.set_unavailable(true);

        assert!(matches!(strategy.get(3).await, Err(AppError::Database(_))));
        assert!(!cache.exists("lock:item:3").await.unwrap());
        assert!(!cache.exists("cache:item:3").await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_contention_times_out() {
        let (cache, _store, strategy) = setup();
        cache
            .set_nx("lock:item:4", "someone-else", Duration::from_secs(10))
            .await
            .unwrap();

        assert!(matches!(strategy.get(4).await, Err(AppError::Timeout(_))));
    }
}
