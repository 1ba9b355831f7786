//! 缓存指标

use metrics::counter;

// ============================================================================
// 读路径
// ============================================================================

/// 记录一次缓存读取结果
///
/// outcome: hit / absent / miss / stale
pub(crate) fn record_read(strategy: &'static str, outcome: &'static str) {
    let labels = [("strategy", strategy), ("outcome", outcome)];
    counter!("cache_read_total", &labels).increment(1);
}

/// 记录一次缓存重建
pub(crate) fn record_rebuild(strategy: &'static str, success: bool) {
    let labels = [
        ("strategy", strategy.to_string()),
        ("result", if success { "success" } else { "failure" }.to_string()),
    ];
    counter!("cache_rebuild_total", &labels).increment(1);
}

// ============================================================================
// ID 生成
// ============================================================================

pub(crate) fn record_id_generated(prefix: &str) {
    let labels = [("prefix", prefix.to_string())];
    counter!("id_generated_total", &labels).increment(1);
}
