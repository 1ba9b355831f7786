//! 测试夹具：进程内缓存、存储与仓储

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use review_cache::memory::{InMemoryCache, InMemoryRecordStore};
use review_config::CacheConfig;
use review_errors::{AppError, AppResult};
use shop_service::domain::entities::{Follow, Shop, ShopType, User};
use shop_service::domain::repositories::{FollowRepository, ShopTypeRepository};

/// 店铺存储，支持按 type_id 查询
pub fn shop_store() -> InMemoryRecordStore<Shop> {
    InMemoryRecordStore::new().with_field_matcher(|shop: &Shop, field, value| match field {
        "type_id" => Ok(shop.type_id.to_string() == value),
        other => Err(AppError::validation(format!("Unsupported shop query field: {}", other))),
    })
}

pub fn shop_at(name: &str, type_id: i64, x: f64, y: f64) -> Shop {
    Shop::new(name, type_id, x, y)
}

/// 无抖动的缓存配置
pub fn cache_config(strategy: &str) -> CacheConfig {
    CacheConfig {
        shop_strategy: strategy.to_string(),
        jitter_secs: 0,
        null_jitter_secs: 0,
        lock_retry_delay_ms: 10,
        ..CacheConfig::default()
    }
}

pub fn cache() -> Arc<InMemoryCache> {
    Arc::new(InMemoryCache::new())
}

#[derive(Default)]
pub struct FakeShopTypeRepository {
    types: Mutex<Vec<ShopType>>,
    calls: AtomicU64,
}

impl FakeShopTypeRepository {
    pub fn with_types(types: Vec<ShopType>) -> Self {
        Self {
            types: Mutex::new(types),
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShopTypeRepository for FakeShopTypeRepository {
    async fn list_ordered(&self) -> AppResult<Vec<ShopType>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut types = self.types.lock().unwrap().clone();
        types.sort_by_key(|t| (t.sort, t.id));
        Ok(types)
    }
}

#[derive(Default)]
pub struct FakeFollowRepository {
    follows: Mutex<BTreeSet<(i64, i64)>>,
}

#[async_trait]
impl FollowRepository for FakeFollowRepository {
    async fn insert(&self, follow: &Follow) -> AppResult<()> {
        self.follows
            .lock()
            .unwrap()
            .insert((follow.user_id, follow.follow_user_id));
        Ok(())
    }

    async fn delete(&self, user_id: i64, follow_user_id: i64) -> AppResult<bool> {
        Ok(self.follows.lock().unwrap().remove(&(user_id, follow_user_id)))
    }

    async fn exists(&self, user_id: i64, follow_user_id: i64) -> AppResult<bool> {
        Ok(self.follows.lock().unwrap().contains(&(user_id, follow_user_id)))
    }
}

pub fn user_store(names: &[&str]) -> Arc<InMemoryRecordStore<User>> {
    let store = InMemoryRecordStore::new();
    for (i, name) in names.iter().enumerate() {
        store.insert(User::new(format!("1380000000{}", i), *name));
    }
    Arc::new(store)
}
