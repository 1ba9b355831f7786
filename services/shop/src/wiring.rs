//! 按配置组装店铺读策略

use std::sync::Arc;

use review_cache::{
    CacheOptions, CacheReadStrategy, CacheStrategyKind, LogicalExpireStrategy, MutexCacheStrategy,
    RebuildExecutor,
};
use review_config::CacheConfig;
use review_errors::AppResult;
use review_ports::{CachePort, RecordStore};
use tracing::info;

use crate::application::shop_key_space;
use crate::domain::entities::Shop;

/// 配置映射为读策略参数
pub fn cache_options(config: &CacheConfig) -> CacheOptions {
    CacheOptions {
        ttl: config.shop_ttl(),
        null_ttl: config.null_ttl(),
        jitter: config.jitter(),
        null_jitter: config.null_jitter(),
        lock_ttl: config.lock_ttl(),
        retry_delay: config.lock_retry_delay(),
        max_retries: config.lock_max_retries,
        max_wait: config.lock_max_wait(),
        logical_ttl: config.logical_expire(),
    }
}

/// 组装好的店铺读路径
pub struct ShopReader {
    pub kind: CacheStrategyKind,
    pub reader: Arc<dyn CacheReadStrategy<Shop>>,
    /// 仅逻辑过期策略持有，用于预热
    pub logical: Option<Arc<LogicalExpireStrategy<Shop>>>,
    /// 仅逻辑过期策略持有，关闭时需要等待后台重建退出
    pub executor: Option<Arc<RebuildExecutor>>,
}

impl ShopReader {
    /// 逻辑过期策略下预热给定店铺，互斥策略下什么都不做
    pub async fn warm(&self, ids: &[i64]) -> usize {
        match &self.logical {
            Some(logical) => logical.warm_all(ids).await,
            None => 0,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(executor) = &self.executor {
            executor.shutdown().await;
        }
    }
}

/// 根据 `cache.shop_strategy` 创建读策略，未知取值返回 Validation 错误
pub fn build_shop_reader(
    config: &CacheConfig,
    cache: Arc<dyn CachePort>,
    store: Arc<dyn RecordStore<Shop>>,
) -> AppResult<ShopReader> {
    let kind: CacheStrategyKind = config.shop_strategy.parse()?;
    let options = cache_options(config);

    let reader = match kind {
        CacheStrategyKind::Mutex => ShopReader {
            kind,
            reader: Arc::new(MutexCacheStrategy::new(cache, store, shop_key_space(), options)),
            logical: None,
            executor: None,
        },
        CacheStrategyKind::Logical => {
            let executor = Arc::new(RebuildExecutor::new(
                config.rebuild_workers,
                config.rebuild_queue_capacity,
            ));
            let logical = Arc::new(LogicalExpireStrategy::new(
                cache,
                store,
                shop_key_space(),
                options,
                executor.clone(),
            ));
            ShopReader {
                kind,
                reader: logical.clone(),
                logical: Some(logical),
                executor: Some(executor),
            }
        }
    };

    info!(strategy = kind.as_str(), "Shop cache strategy selected");
    Ok(reader)
}
