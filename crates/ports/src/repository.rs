//! Record store trait 定义

use async_trait::async_trait;
use review_common::Pagination;
use review_errors::AppResult;

/// 拥有数值主键的实体
pub trait Identified {
    fn id(&self) -> Option<i64>;

    /// 保存后回填主键
    fn set_id(&mut self, id: i64);
}

/// 权威记录存储
///
/// 只提供单行原子 CRUD 和按字段的分页查询，事务细节由实现方负责
#[async_trait]
pub trait RecordStore<T>: Send + Sync {
    /// 根据 ID 查找
    async fn get_by_id(&self, id: i64) -> AppResult<Option<T>>;

    /// 保存实体，返回带主键的实体
    async fn save(&self, record: &T) -> AppResult<T>;

    /// 按主键更新，返回是否有行被更新
    async fn update(&self, record: &T) -> AppResult<bool>;

    /// 批量查询，不保证返回顺序
    async fn list_by_ids(&self, ids: &[i64]) -> AppResult<Vec<T>>;

    /// 按字段等值分页查询
    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<T>>;
}
