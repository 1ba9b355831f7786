//! 店铺类型 Repository trait

use async_trait::async_trait;
use review_errors::AppResult;

use crate::domain::entities::ShopType;

#[async_trait]
pub trait ShopTypeRepository: Send + Sync {
    /// 全部类型，按 sort 升序
    async fn list_ordered(&self) -> AppResult<Vec<ShopType>>;
}
