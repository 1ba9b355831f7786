//! 附近查询
//!
//! 地理索引只保存 ID 和坐标：按距离取前 `page * page_size` 条，在内存中跳过前几页，
//! 再批量回表并按距离顺序重新排列

use std::collections::HashMap;
use std::sync::Arc;

use review_common::{DEFAULT_PAGE_SIZE, Pagination};
use review_errors::AppResult;
use review_ports::{CachePort, GeoPoint, Identified, RecordStore};
use tracing::{debug, warn};

/// 一条附近查询结果，未提供原点时没有距离
#[derive(Debug, Clone, PartialEq)]
pub struct Nearby<T> {
    pub item: T,
    pub distance_meters: Option<f64>,
}

/// 地理索引 + 记录存储的合并查询
pub struct ProximityQuery<T> {
    cache: Arc<dyn CachePort>,
    store: Arc<dyn RecordStore<T>>,
    geo_key_prefix: String,
    category_field: String,
    page_size: u32,
}

impl<T> ProximityQuery<T>
where
    T: Identified + Send + Sync + 'static,
{
    /// `geo_key_prefix` 与分类值拼接成索引键，`category_field` 用于无原点时的字段查询
    pub fn new(
        cache: Arc<dyn CachePort>,
        store: Arc<dyn RecordStore<T>>,
        geo_key_prefix: impl Into<String>,
        category_field: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            store,
            geo_key_prefix: geo_key_prefix.into(),
            category_field: category_field.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn geo_key(&self, category: &str) -> String {
        format!("{}{}", self.geo_key_prefix, category)
    }

    /// 把一条记录的坐标写入分类索引
    pub async fn index(&self, category: &str, id: i64, point: GeoPoint) -> AppResult<()> {
        self.cache
            .geo_add(&self.geo_key(category), &id.to_string(), point)
            .await
    }

    /// 查询某分类下的第 `page` 页（从 1 开始）
    pub async fn query_nearby(
        &self,
        category: &str,
        origin: Option<GeoPoint>,
        radius_meters: f64,
        page: u32,
    ) -> AppResult<Vec<Nearby<T>>> {
        let pagination = Pagination::new(page, self.page_size);

        let Some(origin) = origin else {
            let records = self
                .store
                .query_by_field(&self.category_field, category, &pagination)
                .await?;
            return Ok(records
                .into_iter()
                .map(|item| Nearby {
                    item,
                    distance_meters: None,
                })
                .collect());
        };

        let key = self.geo_key(category);
        let hits = self
            .cache
            .geo_search(&key, origin, radius_meters, pagination.end() as usize)
            .await?;

        let from = pagination.offset() as usize;
        if hits.len() <= from {
            debug!(key = %key, found = hits.len(), page = pagination.page, "No results on page");
            return Ok(Vec::new());
        }

        let ranked: Vec<(i64, f64)> = hits
            .into_iter()
            .skip(from)
            .filter_map(|hit| match hit.member.parse::<i64>() {
                Ok(id) => Some((id, hit.distance_meters)),
                Err(_) => {
                    warn!(key = %key, member = %hit.member, "Ignoring non-numeric geo member");
                    None
                }
            })
            .collect();

        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        let mut by_id: HashMap<i64, T> = self
            .store
            .list_by_ids(&ids)
            .await?
            .into_iter()
            .filter_map(|record| record.id().map(|id| (id, record)))
            .collect();

        Ok(ranked
            .into_iter()
            .filter_map(|(id, distance)| {
                by_id.remove(&id).map(|item| Nearby {
                    item,
                    distance_meters: Some(distance),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryCache, InMemoryRecordStore};
    use review_errors::AppError;

    #[derive(Debug, Clone, PartialEq)]
    struct Place {
        id: Option<i64>,
        kind: String,
    }

    impl Identified for Place {
        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    fn setup() -> (Arc<InMemoryRecordStore<Place>>, ProximityQuery<Place>) {
        let cache = Arc::new(InMemoryCache::new());
        let store = Arc::new(InMemoryRecordStore::new().with_field_matcher(
            |place: &Place, field, value| match field {
                "kind" => Ok(place.kind == value),
                other => Err(AppError::validation(format!("Unsupported query field: {}", other))),
            },
        ));
        let query = ProximityQuery::new(cache, store.clone(), "place:geo:", "kind").with_page_size(2);
        (store, query)
    }

    #[tokio::test]
    async fn test_pages_follow_distance_order() {
        let (store, query) = setup();
        for lon in [0.003, 0.001, 0.002] {
            let place = store.insert(Place {
                id: None,
                kind: "cafe".into(),
            });
            query
                .index("cafe", place.id.unwrap(), GeoPoint::new(lon, 0.0))
                .await
                .unwrap();
        }

        let first = query
            .query_nearby("cafe", Some(GeoPoint::new(0.0, 0.0)), 5000.0, 1)
            .await
            .unwrap();
        let ids: Vec<_> = first.iter().map(|n| n.item.id.unwrap()).collect();
        assert_eq!(ids, vec![2, 3]);

        let second = query
            .query_nearby("cafe", Some(GeoPoint::new(0.0, 0.0)), 5000.0, 2)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].item.id, Some(1));

        let third = query
            .query_nearby("cafe", Some(GeoPoint::new(0.0, 0.0)), 5000.0, 3)
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_without_origin_falls_back_to_field_query() {
        let (store, query) = setup();
        store.insert(Place {
            id: None,
            kind: "cafe".into(),
        });
        store.insert(Place {
            id: None,
            kind: "bar".into(),
        });

        let results = query.query_nearby("cafe", None, 5000.0, 0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].distance_meters, None);
    }

    #[tokio::test]
    async fn test_huge_page_is_empty() {
        let (store, query) = setup();
        let place = store.insert(Place {
            id: None,
            kind: "cafe".into(),
        });
        query
            .index("cafe", place.id.unwrap(), GeoPoint::new(0.001, 0.0))
            .await
            .unwrap();

        let origin = Some(GeoPoint::new(0.0, 0.0));
        for page in [1_000_000_000, u32::MAX] {
            let results = query.query_nearby("cafe", origin, 5000.0, page).await.unwrap();
            assert!(results.is_empty());
        }
        let fallback = query.query_nearby("cafe", None, 5000.0, u32::MAX).await.unwrap();
        assert!(fallback.is_empty());
    }

    #[tokio::test]
    async fn test_drops_ids_missing_from_store() {
        let (_store, query) = setup();
        query.index("cafe", 42, GeoPoint::new(0.001, 0.0)).await.unwrap();

        let results = query
            .query_nearby("cafe", Some(GeoPoint::new(0.0, 0.0)), 5000.0, 1)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
