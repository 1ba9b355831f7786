//! Redis 连接管理

use std::time::{Duration, Instant};

use redis::Client;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use review_errors::{AppError, AppResult};
use tracing::debug;

/// 连接管理器的超时设置
#[derive(Debug, Clone)]
pub struct RedisConnectionOptions {
    pub connection_timeout: Duration,
    pub response_timeout: Duration,
    pub reconnect_retries: usize,
}

impl Default for RedisConnectionOptions {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(3),
            reconnect_retries: 6,
        }
    }
}

/// 创建 Redis 连接管理器
pub async fn create_connection_manager(
    url: &str,
    options: &RedisConnectionOptions,
) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::internal(format!("Failed to create Redis client: {}", e)))?;

    let config = ConnectionManagerConfig::new()
        .set_connection_timeout(options.connection_timeout)
        .set_response_timeout(options.response_timeout)
        .set_number_of_retries(options.reconnect_retries);

    ConnectionManager::new_with_config(client, config)
        .await
        .map_err(|e| {
            AppError::internal(format!("Failed to create Redis connection manager: {}", e))
        })
}

/// 检查 Redis 连接，返回 PING 往返耗时
pub async fn check_connection(conn: &mut ConnectionManager) -> AppResult<Duration> {
    let start = Instant::now();
    redis::cmd("PING")
        .query_async::<String>(conn)
        .await
        .map_err(|e| AppError::internal(format!("Redis health check failed: {}", e)))?;
    let latency = start.elapsed();
    debug!(latency_ms = latency.as_millis() as u64, "Redis health check passed");
    Ok(latency)
}
