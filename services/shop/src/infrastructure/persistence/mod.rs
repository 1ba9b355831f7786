//! PostgreSQL 持久化

mod postgres_follow_repository;
mod postgres_shop_store;
mod postgres_shop_type_repository;
mod postgres_user_store;

pub use postgres_follow_repository::PostgresFollowRepository;
pub use postgres_shop_store::PostgresShopStore;
pub use postgres_shop_type_repository::PostgresShopTypeRepository;
pub use postgres_user_store::PostgresUserStore;

use review_common::Pagination;

/// 分页参数转换为 LIMIT / OFFSET
pub(crate) fn limit_offset(pagination: &Pagination) -> (i64, i64) {
    (
        i64::from(pagination.page_size),
        i64::from(pagination.offset()),
    )
}
