//! review-ports - 抽象 trait 层
//!
//! 定义缓存、分布式锁与记录存储的抽象接口，缓存一致性层只依赖这里的 trait

mod cache;
mod geo;
mod lock;
mod repository;

pub use cache::*;
pub use geo::*;
pub use lock::*;
pub use repository::*;
