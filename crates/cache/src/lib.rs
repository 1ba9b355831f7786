//! review-cache - 缓存一致性层
//!
//! 在 Redis 与 PostgreSQL 之间维持缓存一致性，并处理缓存击穿、缓存穿透：
//! - `strategy`: 互斥锁重建与逻辑过期两种读策略
//! - `invalidation`: 先写库再删缓存的写入口
//! - `id_worker`: 基于日期分桶计数器的全局 ID
//! - `geo`: 附近查询结果与记录存储的合并
//! - `memory`: 端口的进程内实现，用于测试与单机开发

mod executor;
pub mod geo;
pub mod id_worker;
pub mod invalidation;
mod jitter;
mod keys;
pub mod lock;
pub mod memory;
mod metrics;
pub mod strategy;

pub use executor::RebuildExecutor;
pub use geo::{Nearby, ProximityQuery};
pub use id_worker::IdWorker;
pub use invalidation::CacheInvalidatingWriter;
pub use jitter::TtlJitter;
pub use keys::KeySpace;
pub use lock::{CacheLock, run_locked};
pub use strategy::{
    CacheOptions, CacheReadStrategy, CacheStrategyKind, LogicalExpireStrategy,
    LogicalExpiryEnvelope, MutexCacheStrategy,
};
