//! 服务错误定义

use review_errors::AppError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    #[error("shop does not exist")]
    ShopNotFound,

    #[error("shop id is required")]
    MissingShopId,

    #[error("shop type list is empty")]
    ShopTypesEmpty,

    #[error("user cannot follow themselves")]
    SelfFollow,
}

impl From<ShopError> for AppError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::ShopNotFound => AppError::not_found("shop does not exist"),
            ShopError::MissingShopId => AppError::validation("shop id is required"),
            ShopError::ShopTypesEmpty => AppError::not_found("shop type list is empty"),
            ShopError::SelfFollow => AppError::validation("user cannot follow themselves"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_not_found_message() {
        let err: AppError = ShopError::ShopNotFound.into();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "shop does not exist"));
    }

    #[test]
    fn test_validation_mapping() {
        assert!(matches!(AppError::from(ShopError::SelfFollow), AppError::Validation(_)));
        assert!(matches!(AppError::from(ShopError::MissingShopId), AppError::Validation(_)));
    }
}
