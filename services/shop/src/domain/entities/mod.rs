mod follow;
mod shop;
mod shop_type;
mod user;

pub use follow::Follow;
pub use shop::Shop;
pub use shop_type::ShopType;
pub use user::{User, UserSummary};
