//! 店铺实体

use chrono::{DateTime, Utc};
use review_ports::{GeoPoint, Identified};
use serde::{Deserialize, Serialize};

/// 店铺
///
/// `x` 为经度，`y` 为纬度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: Option<i64>,
    pub name: String,
    pub type_id: i64,
    /// 图片地址，多个以逗号分隔
    pub images: String,
    /// 商圈
    pub area: Option<String>,
    pub address: String,
    pub x: f64,
    pub y: f64,
    /// 人均价格（分）
    pub avg_price: Option<i64>,
    pub sold: i32,
    pub comments: i32,
    /// 评分，1~5 分乘 10 保存
    pub score: i32,
    /// 营业时间，例如 10:00-22:00
    pub open_hours: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Shop {
    pub fn new(name: impl Into<String>, type_id: i64, x: f64, y: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            type_id,
            images: String::new(),
            area: None,
            address: String::new(),
            x,
            y,
            avg_price: None,
            sold: 0,
            comments: 0,
            score: 0,
            open_hours: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.x, self.y)
    }
}

impl Identified for Shop {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let mut shop = Shop::new("103茶餐厅", 1, 120.149192, 30.316078);
        shop.set_id(1);
        shop.avg_price = Some(80);

        let json = serde_json::to_value(&shop).unwrap();
        assert_eq!(json["typeId"], 1);
        assert_eq!(json["avgPrice"], 80);
        assert_eq!(json["openHours"], serde_json::Value::Null);
    }

    #[test]
    fn test_location_uses_x_as_longitude() {
        let shop = Shop::new("a", 1, 120.1, 30.3);
        assert_eq!(shop.location(), GeoPoint::new(120.1, 30.3));
    }
}
