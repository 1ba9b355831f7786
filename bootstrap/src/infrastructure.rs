//! 基础设施资源管理
//!
//! 统一创建服务共享的 PostgreSQL 连接池和 Redis 连接

use std::time::Duration;

use redis::aio::ConnectionManager;
use review_adapter_postgres::{PostgresConfig, create_pool};
use review_adapter_redis::{RedisCache, RedisConnectionOptions, create_connection_manager};
use review_common::{RetryConfig, with_retry};
use review_config::AppConfig;
use review_errors::AppResult;
use review_telemetry::HealthStatus;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, warn};

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// PostgreSQL 连接池
    postgres_pool: PgPool,
    /// Redis 连接管理器
    redis_conn: ConnectionManager,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        // 1. PostgreSQL 连接池
        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections)
            .with_acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs));
        let postgres_pool = with_retry(&retry_config, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move { create_pool(&cfg).await }
        })
        .await?;
        info!(
            max_connections = config.database.max_connections,
            "PostgreSQL connection pool created"
        );

        // 2. Redis 连接
        let redis_options = RedisConnectionOptions {
            connection_timeout: Duration::from_secs(config.redis.connection_timeout_secs),
            response_timeout: Duration::from_secs(config.redis.response_timeout_secs),
            ..RedisConnectionOptions::default()
        };
        let redis_url = config.redis.url.clone();
        let redis_conn = with_retry(&retry_config, "Redis connection", || {
            let url = redis_url.expose_secret().clone();
            let options = redis_options.clone();
            async move { create_connection_manager(&url, &options).await }
        })
        .await?;
        info!("Redis connection created");

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
        })
    }

    /// 获取应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取 PostgreSQL 连接池
    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    /// 获取 Redis 连接管理器
    pub fn redis_connection_manager(&self) -> ConnectionManager {
        self.redis_conn.clone()
    }

    /// 获取 Redis 缓存（实现 CachePort trait）
    pub fn redis_cache(&self) -> RedisCache {
        RedisCache::new(self.redis_conn.clone())
    }

    /// 检查 PostgreSQL 与 Redis 是否可用
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new();

        match review_adapter_postgres::check_connection(&self.postgres_pool).await {
            Ok(latency) => status.add_check(
                "postgres",
                true,
                Some(format!("{}ms", latency.as_millis())),
            ),
            Err(e) => status.add_check("postgres", false, Some(e.to_string())),
        }

        let mut conn = self.redis_conn.clone();
        match review_adapter_redis::check_connection(&mut conn).await {
            Ok(latency) => status.add_check(
                "redis",
                true,
                Some(format!("{}ms", latency.as_millis())),
            ),
            Err(e) => status.add_check("redis", false, Some(e.to_string())),
        }

        if !status.healthy {
            warn!(failing = ?status.failing(), "Infrastructure health check failed");
        }
        status
    }
}
