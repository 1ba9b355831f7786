//! Shop Service - 店铺服务入口

use std::sync::Arc;
use std::time::Duration;

use review_bootstrap::{Infrastructure, RuntimeConfig, init_runtime, shutdown_signal};
use review_errors::AppError;
use review_ports::{CachePort, RecordStore};
use shop_service::application::{ShopService, ShopTypeService};
use shop_service::domain::entities::Shop;
use shop_service::domain::repositories::ShopTypeRepository;
use shop_service::infrastructure::persistence::{PostgresShopStore, PostgresShopTypeRepository};
use shop_service::wiring::build_shop_reader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RuntimeConfig::default().load()?;
    init_runtime(&config)?;

    let infra = Infrastructure::from_config(config).await?;
    let config = infra.config().clone();
    let pool = infra.postgres_pool();

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to run migrations: {}", e)))?;
    info!("Database migrations applied");

    // 组装 Cache（依赖 CachePort trait）
    let cache: Arc<dyn CachePort> = Arc::new(infra.redis_cache());

    // 组装 Stores
    let shop_store = Arc::new(PostgresShopStore::new(pool.clone()));
    let shop_records: Arc<dyn RecordStore<Shop>> = shop_store.clone();
    let shop_type_repo: Arc<dyn ShopTypeRepository> =
        Arc::new(PostgresShopTypeRepository::new(pool.clone()));

    // 组装读策略与服务
    let shop_reader = build_shop_reader(&config.cache, cache.clone(), shop_records.clone())?;
    let shop_service = ShopService::new(cache.clone(), shop_records, shop_reader.reader.clone())
        .with_geo(config.geo.radius_meters, config.geo.page_size);
    let shop_type_service = ShopTypeService::new(cache.clone(), shop_type_repo)
        .with_ttl(config.cache.shop_type_ttl(), config.cache.jitter());

    // 预热：地理索引 + 逻辑过期缓存
    let shops = shop_store.list_all().await?;
    let indexed = shop_service.load_geo_index(&shops).await?;
    let ids: Vec<i64> = shops.iter().filter_map(|shop| shop.id).collect();
    let warmed = shop_reader.warm(&ids).await;
    info!(
        shops = shops.len(),
        indexed,
        warmed,
        strategy = shop_reader.kind.as_str(),
        "Shop caches prepared"
    );

    if let Err(e) = shop_type_service.query_type_list().await {
        warn!(error = %e, "Shop type list not cached at startup");
    }

    let health = infra.health_check().await;
    if !health.healthy {
        warn!(failing = ?health.failing(), "Starting with unhealthy dependencies");
    }

    info!(app_name = %config.app_name, "Shop service started");
    shutdown_signal().await;

    match tokio::time::timeout(Duration::from_secs(10), shop_reader.shutdown()).await {
        Ok(()) => info!("Background rebuilds stopped"),
        Err(_) => warn!("Timed out waiting for background rebuilds"),
    }
    pool.close().await;
    info!("Shop service stopped");
    Ok(())
}
