//! 仓储 trait
//!
//! 店铺与用户直接使用 `review_ports::RecordStore`，这里只定义其余的查询形态

mod follow_repository;
mod shop_type_repository;

pub use follow_repository::FollowRepository;
pub use shop_type_repository::ShopTypeRepository;
