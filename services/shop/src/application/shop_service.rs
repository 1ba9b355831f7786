//! 店铺应用服务

use std::collections::BTreeMap;
use std::sync::Arc;

use review_cache::{
    CacheInvalidatingWriter, CacheReadStrategy, KeySpace, Nearby, ProximityQuery,
};
use review_common::DEFAULT_PAGE_SIZE;
use review_errors::{AppError, AppResult};
use review_ports::{CachePort, GeoPoint, RecordStore};
use tracing::{info, instrument};

use crate::domain::entities::Shop;
use crate::error::ShopError;

/// 店铺地理索引键前缀，后接类型 ID
pub const SHOP_GEO_KEY_PREFIX: &str = "shop:geo:";

/// 无坐标查询时使用的分类字段
pub const SHOP_TYPE_FIELD: &str = "type_id";

const DEFAULT_RADIUS_METERS: f64 = 5000.0;

/// 店铺缓存键空间：`cache:shop:{id}` / `lock:shop:{id}`
pub fn shop_key_space() -> KeySpace {
    KeySpace::for_entity("shop")
}

pub struct ShopService {
    reader: Arc<dyn CacheReadStrategy<Shop>>,
    writer: CacheInvalidatingWriter<Shop>,
    proximity: ProximityQuery<Shop>,
    store: Arc<dyn RecordStore<Shop>>,
    radius_meters: f64,
}

impl ShopService {
    pub fn new(
        cache: Arc<dyn CachePort>,
        store: Arc<dyn RecordStore<Shop>>,
        reader: Arc<dyn CacheReadStrategy<Shop>>,
    ) -> Self {
        Self {
            reader,
            writer: CacheInvalidatingWriter::new(cache.clone(), store.clone(), shop_key_space()),
            proximity: ProximityQuery::new(cache, store.clone(), SHOP_GEO_KEY_PREFIX, SHOP_TYPE_FIELD)
                .with_page_size(DEFAULT_PAGE_SIZE),
            store,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }

    /// 附近查询的半径与每页条数
    pub fn with_geo(mut self, radius_meters: f64, page_size: u32) -> Self {
        self.radius_meters = radius_meters;
        self.proximity = self.proximity.with_page_size(page_size);
        self
    }

    /// 根据 ID 查询店铺
    pub async fn query_by_id(&self, id: i64) -> AppResult<Shop> {
        self.reader
            .get(id)
            .await?
            .ok_or_else(|| ShopError::ShopNotFound.into())
    }

    /// 更新店铺，先写库再删缓存
    #[instrument(skip(self, shop), fields(shop_id = ?shop.id))]
    pub async fn update(&self, shop: &Shop) -> AppResult<()> {
        if shop.id.is_none() {
            return Err(ShopError::MissingShopId.into());
        }

        self.writer.update(shop).await.map_err(|e| match e {
            AppError::NotFound(_) => ShopError::ShopNotFound.into(),
            other => other,
        })
    }

    /// 新建店铺并写入地理索引
    #[instrument(skip(self, shop), fields(name = %shop.name, type_id = shop.type_id))]
    pub async fn create_shop(&self, shop: Shop) -> AppResult<Shop> {
        let saved = self.store.save(&shop).await?;
        let id = saved
            .id
            .ok_or_else(|| AppError::internal("saved shop has no id"))?;

        // 清掉此前对该 ID 写入的空标记
        self.writer.invalidate(id).await?;
        self.proximity
            .index(&saved.type_id.to_string(), id, saved.location())
            .await?;

        info!(shop_id = id, "Shop created");
        Ok(saved)
    }

    /// 按类型分页查询，`x`/`y` 同时给出时按距离排序并附带距离
    pub async fn query_by_type(
        &self,
        type_id: i64,
        page: u32,
        x: Option<f64>,
        y: Option<f64>,
    ) -> AppResult<Vec<Nearby<Shop>>> {
        let origin = match (x, y) {
            (Some(x), Some(y)) => Some(GeoPoint::new(x, y)),
            _ => None,
        };

        self.proximity
            .query_nearby(&type_id.to_string(), origin, self.radius_meters, page)
            .await
    }

    /// 按类型分组写入地理索引，返回写入条数
    pub async fn load_geo_index(&self, shops: &[Shop]) -> AppResult<usize> {
        let mut by_type: BTreeMap<i64, Vec<&Shop>> = BTreeMap::new();
        for shop in shops {
            by_type.entry(shop.type_id).or_default().push(shop);
        }

        let mut indexed = 0;
        for (type_id, group) in by_type {
            let category = type_id.to_string();
            for shop in group {
                let Some(id) = shop.id else {
                    continue;
                };
                self.proximity.index(&category, id, shop.location()).await?;
                indexed += 1;
            }
            info!(type_id, key = %self.proximity.geo_key(&category), "Geo index loaded");
        }
        Ok(indexed)
    }
}
