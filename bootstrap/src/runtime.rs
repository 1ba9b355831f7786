//! 服务运行时

use review_config::AppConfig;
use review_errors::{AppError, AppResult};
use review_telemetry::{init_metrics, init_metrics_exporter, init_tracing, init_tracing_json};
use tracing::{debug, error, info};

/// 服务运行时配置
pub struct RuntimeConfig {
    pub config_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string()),
        }
    }
}

impl RuntimeConfig {
    /// 加载应用配置，工作目录下存在 `.env` 时先载入其中的环境变量
    pub fn load(&self) -> AppResult<AppConfig> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        AppConfig::load(&self.config_dir).map_err(|e| AppError::internal(e.to_string()))
    }
}

/// 初始化服务运行时：tracing 与 metrics
///
/// 必须在 tokio 运行时内调用
pub fn init_runtime(config: &AppConfig) -> AppResult<()> {
    let tracing_result = if config.is_production() {
        init_tracing_json(&config.telemetry.log_level)
    } else {
        init_tracing(&config.telemetry.log_level)
    };
    tracing_result.map_err(|e| AppError::internal(e.to_string()))?;

    match config.telemetry.metrics_addr {
        Some(addr) => {
            init_metrics_exporter(addr).map_err(|e| AppError::internal(e.to_string()))?;
            info!(%addr, "Prometheus exporter listening");
        }
        None => {
            init_metrics().map_err(|e| AppError::internal(e.to_string()))?;
        }
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
    Ok(())
}

/// 等待关闭信号
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_internal_error() {
        let runtime = RuntimeConfig {
            config_dir: "/nonexistent/review-config".to_string(),
        };
        assert!(matches!(runtime.load(), Err(AppError::Internal(_))));
    }
}
