//! 店铺类型列表缓存

use std::sync::Arc;
use std::time::Duration;

use review_cache::TtlJitter;
use review_errors::{AppError, AppResult};
use review_ports::CachePort;
use tracing::{debug, warn};

use crate::domain::entities::ShopType;
use crate::domain::repositories::ShopTypeRepository;
use crate::error::ShopError;

/// 整个类型列表缓存在一个键下
pub const SHOP_TYPE_CACHE_KEY: &str = "cache:shop-type";

pub struct ShopTypeService {
    cache: Arc<dyn CachePort>,
    repository: Arc<dyn ShopTypeRepository>,
    ttl: Duration,
    jitter: TtlJitter,
}

impl ShopTypeService {
    pub fn new(cache: Arc<dyn CachePort>, repository: Arc<dyn ShopTypeRepository>) -> Self {
        Self {
            cache,
            repository,
            ttl: Duration::from_secs(30 * 60),
            jitter: TtlJitter::new(Duration::from_secs(10 * 60)),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration, jitter: Duration) -> Self {
        self.ttl = ttl;
        self.jitter = TtlJitter::new(jitter);
        self
    }

    /// 按 sort 升序返回全部类型，列表为空返回 NotFound
    pub async fn query_type_list(&self) -> AppResult<Vec<ShopType>> {
        if let Some(payload) = self.cache.get(SHOP_TYPE_CACHE_KEY).await? {
            match serde_json::from_str::<Vec<ShopType>>(&payload) {
                Ok(types) => {
                    debug!(count = types.len(), "Shop type list cache hit");
                    return Ok(types);
                }
                Err(e) => warn!(error = %e, "Malformed shop type list in cache, reloading"),
            }
        }

        let types = self.repository.list_ordered().await?;
        if types.is_empty() {
            return Err(ShopError::ShopTypesEmpty.into());
        }

        let payload = serde_json::to_string(&types)
            .map_err(|e| AppError::serialization(format!("Failed to serialize shop types: {}", e)))?;
        if let Err(e) = self
            .cache
            .set(SHOP_TYPE_CACHE_KEY, &payload, Some(self.jitter.apply(self.ttl)))
            .await
        {
            warn!(error = %e, "Failed to cache shop type list");
        }
        Ok(types)
    }
}
