//! 缓存一致性层集成测试
//!
//! 使用进程内缓存与记录存储，覆盖读策略、写失效、ID 生成和附近查询的端到端行为

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use review_cache::memory::{InMemoryCache, InMemoryRecordStore, haversine_meters};
use review_cache::{
    CacheInvalidatingWriter, CacheOptions, CacheReadStrategy, IdWorker, KeySpace,
    LogicalExpireStrategy, MutexCacheStrategy, ProximityQuery, RebuildExecutor,
};
use review_errors::AppError;
use review_ports::{CachePort, GeoPoint, Identified};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Shop {
    id: Option<i64>,
    name: String,
    type_id: i64,
}

impl Identified for Shop {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

fn shop(id: i64, name: &str) -> Shop {
    Shop {
        id: Some(id),
        name: name.to_string(),
        type_id: 1,
    }
}

fn fast_options() -> CacheOptions {
    CacheOptions {
        jitter: Duration::ZERO,
        null_jitter: Duration::ZERO,
        retry_delay: Duration::from_millis(10),
        max_retries: 200,
        max_wait: Duration::from_secs(5),
        ..CacheOptions::default()
    }
}

struct Fixture {
    cache: Arc<InMemoryCache>,
    store: Arc<InMemoryRecordStore<Shop>>,
}

impl Fixture {
    fn new(store: InMemoryRecordStore<Shop>) -> Self {
        Self {
            cache: Arc::new(InMemoryCache::new()),
            store: Arc::new(store),
        }
    }

    fn mutex(&self) -> MutexCacheStrategy<Shop> {
        MutexCacheStrategy::new(
            self.cache.clone(),
            self.store.clone(),
            KeySpace::for_entity("shop"),
            fast_options(),
        )
    }

    fn writer(&self) -> CacheInvalidatingWriter<Shop> {
        CacheInvalidatingWriter::new(self.cache.clone(), self.store.clone(), KeySpace::for_entity("shop"))
    }
}

#[tokio::test]
async fn test_mutex_read_sees_write_after_invalidation() {
    let f = Fixture::new(InMemoryRecordStore::new());
    f.store.insert(shop(1, "before"));
    let strategy = f.mutex();
    let writer = f.writer();

    assert_eq!(strategy.get(1).await.unwrap().unwrap().name, "before");

    writer.update(&shop(1, "after")).await.unwrap();
    assert!(!f.cache.exists("cache:shop:1").await.unwrap());

    assert_eq!(strategy.get(1).await.unwrap().unwrap().name, "after");
    assert_eq!(f.store.get_calls(), 2);
}

#[tokio::test]
async fn test_repeated_reads_of_missing_id_hit_store_once() {
    let f = Fixture::new(InMemoryRecordStore::new());
    let strategy = f.mutex();

    for _ in 0..20 {
        assert_eq!(strategy.get(404).await.unwrap(), None);
    }
    assert_eq!(f.store.get_calls(), 1);

    let ttl = f.cache.ttl("cache:shop:404").unwrap();
    assert!(ttl <= Duration::from_secs(120));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_rebuild_once() {
    let f = Fixture::new(InMemoryRecordStore::new().with_latency(Duration::from_millis(100)));
    f.store.insert(shop(7, "busy"));
    let strategy = Arc::new(f.mutex());

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let strategy = strategy.clone();
            tokio::spawn(async move { strategy.get(7).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.unwrap().name, "busy");
    }
    assert_eq!(f.store.get_calls(), 1);
    assert!(!f.cache.exists("lock:shop:7").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_on_absent_id_rebuild_once() {
    let f = Fixture::new(InMemoryRecordStore::new().with_latency(Duration::from_millis(50)));
    let strategy = Arc::new(f.mutex());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let strategy = strategy.clone();
            tokio::spawn(async move { strategy.get(8).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), None);
    }
    assert_eq!(f.store.get_calls(), 1);
}

#[tokio::test]
async fn test_mutex_contention_times_out() {
    let f = Fixture::new(InMemoryRecordStore::new());
    let strategy = MutexCacheStrategy::new(
        f.cache.clone(),
        f.store.clone(),
        KeySpace::for_entity("shop"),
        CacheOptions {
            retry_delay: Duration::from_millis(10),
            max_retries: 3,
            ..fast_options()
        },
    );
    f.cache
        .set_nx("lock:shop:9", "held", Duration::from_secs(30))
        .await
        .unwrap();

    let err = strategy.get(9).await.unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(f.store.get_calls(), 0);
}

#[tokio::test]
async fn test_logical_stale_then_refreshed() {
    let f = Fixture::new(InMemoryRecordStore::new().with_latency(Duration::from_millis(200)));
    f.store.insert(shop(3, "v2"));
    let executor = Arc::new(RebuildExecutor::new(2, 8));
    let strategy = LogicalExpireStrategy::new(
        f.cache.clone(),
        f.store.clone(),
        KeySpace::for_entity("shop"),
        fast_options(),
        executor.clone(),
    );
    strategy
        .set_with_logical_expire(3, Some(shop(3, "v1")), Utc::now() - TimeDelta::seconds(5))
        .await
        .unwrap();

    let started = std::time::Instant::now();
    assert_eq!(strategy.get(3).await.unwrap().unwrap().name, "v1");
    assert!(started.elapsed() < Duration::from_millis(100));

    let mut refreshed = None;
    for _ in 0..100 {
        let current = strategy.get(3).await.unwrap().unwrap();
        if current.name == "v2" {
            refreshed = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(refreshed, Some(shop(3, "v2")));
    assert_eq!(f.store.get_calls(), 1);

    executor.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_id_worker_is_unique_under_concurrency() {
    let cache = Arc::new(InMemoryCache::new());
    let worker = IdWorker::new(cache);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let worker = worker.clone();
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(200);
                for _ in 0..200 {
                    ids.push(worker.next_id("order").await.unwrap());
                }
                ids
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(all.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(all.len(), 10_000);
}

#[tokio::test]
async fn test_id_worker_next_day_is_greater() {
    let cache = Arc::new(InMemoryCache::new());
    let worker = IdWorker::new(cache);
    let day = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
    let next_day = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

    let mut last_today = 0;
    for _ in 0..100 {
        last_today = worker.next_id_at("order", day).await.unwrap();
    }
    let first_tomorrow = worker.next_id_at("order", next_day).await.unwrap();

    assert!(first_tomorrow > last_today);
    assert_eq!(first_tomorrow & u64::from(u32::MAX), 1);
}

#[tokio::test]
async fn test_nearby_follows_geo_order_not_store_order() {
    let cache = Arc::new(InMemoryCache::new());
    let store = Arc::new(InMemoryRecordStore::<Shop>::new());
    let query = ProximityQuery::new(cache.clone(), store.clone(), "shop:geo:", "type_id");

    let meters_per_degree = haversine_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
    // 存储顺序与距离顺序相反
    let placements = [(1, 4000.0), (2, 200.0), (3, 10.0)];
    for (id, meters) in placements {
        store.insert(shop(id, &format!("shop-{}", id)));
        cache
            .geo_add(
                "shop:geo:cafe",
                &id.to_string(),
                GeoPoint::new(meters / meters_per_degree, 0.0),
            )
            .await
            .unwrap();
    }

    let results = query
        .query_nearby("cafe", Some(GeoPoint::new(0.0, 0.0)), 5000.0, 1)
        .await
        .unwrap();

    let ids: Vec<_> = results.iter().map(|n| n.item.id.unwrap()).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    for (result, expected) in results.iter().zip([10.0, 200.0, 4000.0]) {
        let distance = result.distance_meters.unwrap();
        assert!((distance - expected).abs() < 0.5, "{} vs {}", distance, expected);
    }
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test]
async fn test_update_leaves_next_read_as_miss() {
    let f = Fixture::new(InMemoryRecordStore::new());
    f.store.insert(shop(5, "old"));
    let strategy = f.mutex();
    strategy.get(5).await.unwrap();
    assert!(f.cache.exists("cache:shop:5").await.unwrap());

    f.writer().update(&shop(5, "new")).await.unwrap();

    assert_eq!(f.cache.get("cache:shop:5").await.unwrap(), None);
}
