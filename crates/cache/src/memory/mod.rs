//! 进程内实现，用于本地开发与测试

mod cache;
mod store;

pub use cache::{InMemoryCache, haversine_meters};
pub use store::InMemoryRecordStore;
