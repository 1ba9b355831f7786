//! 关注 Repository trait

use async_trait::async_trait;
use review_errors::AppResult;

use crate::domain::entities::Follow;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// 保存关注关系，已存在时不报错
    async fn insert(&self, follow: &Follow) -> AppResult<()>;

    /// 删除关注关系，返回是否有行被删除
    async fn delete(&self, user_id: i64, follow_user_id: i64) -> AppResult<bool>;

    /// 是否已关注
    async fn exists(&self, user_id: i64, follow_user_id: i64) -> AppResult<bool>;
}
