//! 应用服务层

mod follow_service;
mod shop_service;
mod shop_type_service;
mod sign_service;

pub use follow_service::{FollowService, follow_key};
pub use shop_service::{SHOP_GEO_KEY_PREFIX, SHOP_TYPE_FIELD, ShopService, shop_key_space};
pub use shop_type_service::{SHOP_TYPE_CACHE_KEY, ShopTypeService};
pub use sign_service::{SignService, sign_key};
