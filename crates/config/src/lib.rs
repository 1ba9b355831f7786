//! review-config - 配置加载库
//!
//! 加载顺序：`{dir}/default.toml` → `{dir}/{APP_ENV}.toml` → `REVIEW_` 前缀环境变量，
//! 环境变量用 `__` 分隔层级，例如 `REVIEW_CACHE__SHOP_STRATEGY=logical`

use std::net::SocketAddr;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
    #[serde(default = "default_redis_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_redis_response_timeout_secs")]
    pub response_timeout_secs: u64,
}

fn default_redis_connection_timeout_secs() -> u64 {
    5
}

fn default_redis_response_timeout_secs() -> u64 {
    3
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus 抓取地址，不配置则只安装 recorder
    pub metrics_addr: Option<SocketAddr>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_addr: None,
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 店铺读策略：mutex | logical
    pub shop_strategy: String,
    pub shop_ttl_secs: u64,
    pub null_ttl_secs: u64,
    pub jitter_secs: u64,
    pub null_jitter_secs: u64,
    pub lock_ttl_secs: u64,
    pub lock_retry_delay_ms: u64,
    pub lock_max_retries: u32,
    pub lock_max_wait_ms: u64,
    pub logical_expire_secs: u64,
    pub rebuild_workers: usize,
    pub rebuild_queue_capacity: usize,
    pub shop_type_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shop_strategy: "mutex".to_string(),
            shop_ttl_secs: 1800,
            null_ttl_secs: 120,
            jitter_secs: 600,
            null_jitter_secs: 60,
            lock_ttl_secs: 10,
            lock_retry_delay_ms: 50,
            lock_max_retries: 100,
            lock_max_wait_ms: 5000,
            logical_expire_secs: 30,
            rebuild_workers: 10,
            rebuild_queue_capacity: 1024,
            shop_type_ttl_secs: 1800,
        }
    }
}

impl CacheConfig {
    pub fn shop_ttl(&self) -> Duration {
        Duration::from_secs(self.shop_ttl_secs)
    }

    pub fn null_ttl(&self) -> Duration {
        Duration::from_secs(self.null_ttl_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }

    pub fn null_jitter(&self) -> Duration {
        Duration::from_secs(self.null_jitter_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_delay_ms)
    }

    pub fn lock_max_wait(&self) -> Duration {
        Duration::from_millis(self.lock_max_wait_ms)
    }

    pub fn logical_expire(&self) -> Duration {
        Duration::from_secs(self.logical_expire_secs)
    }

    pub fn shop_type_ttl(&self) -> Duration {
        Duration::from_secs(self.shop_type_ttl_secs)
    }
}

/// 附近查询配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub radius_meters: f64,
    pub page_size: u32,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            radius_meters: 5000.0,
            page_size: 5,
        }
    }
}

/// ID 生成配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    /// 时间戳起点（Unix 秒），默认 2025-01-01T00:00:00Z
    pub epoch_offset_secs: i64,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            epoch_offset_secs: 1_735_689_600,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub id: IdConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());
        Self::figment(config_dir, &env).extract().map_err(ConfigError::from)
    }

    fn figment(config_dir: &str, env: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("REVIEW_").split("__"))
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
