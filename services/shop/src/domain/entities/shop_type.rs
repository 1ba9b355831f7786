use serde::{Deserialize, Serialize};

/// 店铺类型，按 `sort` 升序展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopType {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub sort: i32,
}
