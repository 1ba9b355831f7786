//! Cache trait 定义

use async_trait::async_trait;
use review_errors::AppResult;
use std::time::Duration;

use crate::{GeoHit, GeoPoint};

/// 缓存 trait
///
/// 只暴露原子原语，锁、计数器与读写策略都构建在这组原语之上
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值，`ttl` 为 None 时不过期
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// 键不存在时才设置（SET NX），返回是否设置成功
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// 删除缓存
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 值等于 `expected_value` 时才删除，返回是否删除
    async fn delete_if_equals(&self, key: &str, expected_value: &str) -> AppResult<bool>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// 设置过期时间
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()>;

    /// 原子递增，键不存在时从 0 开始，返回递增后的值
    async fn incr(&self, key: &str) -> AppResult<i64>;

    /// 读取位图中的一位
    async fn get_bit(&self, key: &str, offset: u64) -> AppResult<bool>;

    /// 设置位图中的一位，返回原来的值
    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> AppResult<bool>;

    /// BITFIELD GET u{bits} {offset}，键不存在时返回 0
    async fn bitfield_get_unsigned(&self, key: &str, bits: u8, offset: u64) -> AppResult<u64>;

    /// 向地理索引添加成员
    async fn geo_add(&self, key: &str, member: &str, point: GeoPoint) -> AppResult<()>;

    /// 按半径搜索，结果按距离升序并附带距离（米），最多 `limit` 条
    async fn geo_search(
        &self,
        key: &str,
        origin: GeoPoint,
        radius_meters: f64,
        limit: usize,
    ) -> AppResult<Vec<GeoHit>>;

    /// 向集合添加成员，返回是否新增
    async fn set_add(&self, key: &str, member: &str) -> AppResult<bool>;

    /// 从集合移除成员，返回是否移除
    async fn set_remove(&self, key: &str, member: &str) -> AppResult<bool>;

    /// 集合交集
    async fn set_intersect(&self, keys: &[&str]) -> AppResult<Vec<String>>;
}
