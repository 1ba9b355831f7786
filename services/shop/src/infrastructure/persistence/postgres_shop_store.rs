//! PostgreSQL 店铺存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review_common::Pagination;
use review_errors::{AppError, AppResult};
use review_ports::RecordStore;
use sqlx::PgPool;

use super::limit_offset;
use crate::domain::entities::Shop;

const SHOP_COLUMNS: &str = "id, name, type_id, images, area, address, x, y, avg_price, sold, \
                            comments, score, open_hours, created_at, updated_at";

pub struct PostgresShopStore {
    pool: PgPool,
}

impl PostgresShopStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 全部店铺，用于加载地理索引和预热
    pub async fn list_all(&self) -> AppResult<Vec<Shop>> {
        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {} FROM shops ORDER BY id",
            SHOP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list shops: {}", e)))?;

        Ok(rows.into_iter().map(ShopRow::into_shop).collect())
    }
}

/// 可以按等值查询的字段
enum ShopField {
    TypeId(i64),
    Name(String),
    Area(String),
}

impl ShopField {
    fn parse(field: &str, value: &str) -> AppResult<Self> {
        match field {
            "type_id" => value
                .parse::<i64>()
                .map(Self::TypeId)
                .map_err(|_| AppError::validation(format!("Invalid type_id: {}", value))),
            "name" => Ok(Self::Name(value.to_string())),
            "area" => Ok(Self::Area(value.to_string())),
            other => Err(AppError::validation(format!(
                "Unsupported shop query field: {}",
                other
            ))),
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::TypeId(_) => "type_id",
            Self::Name(_) => "name",
            Self::Area(_) => "area",
        }
    }
}

#[async_trait]
impl RecordStore<Shop> for PostgresShopStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<Shop>> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {} FROM shops WHERE id = $1",
            SHOP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find shop: {}", e)))?;

        Ok(row.map(ShopRow::into_shop))
    }

    async fn save(&self, shop: &Shop) -> AppResult<Shop> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            r#"
            INSERT INTO shops (name, type_id, images, area, address, x, y, avg_price, sold,
                               comments, score, open_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            SHOP_COLUMNS
        ))
        .bind(&shop.name)
        .bind(shop.type_id)
        .bind(&shop.images)
        .bind(&shop.area)
        .bind(&shop.address)
        .bind(shop.x)
        .bind(shop.y)
        .bind(shop.avg_price)
        .bind(shop.sold)
        .bind(shop.comments)
        .bind(shop.score)
        .bind(&shop.open_hours)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save shop: {}", e)))?;

        Ok(row.into_shop())
    }

    async fn update(&self, shop: &Shop) -> AppResult<bool> {
        let Some(id) = shop.id else {
            return Err(AppError::validation("shop id is required"));
        };

        let result = sqlx::query(
            r#"
            UPDATE shops SET
                name = $2, type_id = $3, images = $4, area = $5, address = $6, x = $7, y = $8,
                avg_price = $9, sold = $10, comments = $11, score = $12, open_hours = $13,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&shop.name)
        .bind(shop.type_id)
        .bind(&shop.images)
        .bind(&shop.area)
        .bind(&shop.address)
        .bind(shop.x)
        .bind(shop.y)
        .bind(shop.avg_price)
        .bind(shop.sold)
        .bind(shop.comments)
        .bind(shop.score)
        .bind(&shop.open_hours)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update shop: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Shop>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {} FROM shops WHERE id = ANY($1)",
            SHOP_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list shops: {}", e)))?;

        Ok(rows.into_iter().map(ShopRow::into_shop).collect())
    }

    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<Shop>> {
        let field = ShopField::parse(field, value)?;
        let (limit, offset) = limit_offset(pagination);
        let sql = format!(
            "SELECT {} FROM shops WHERE {} = $1 ORDER BY id LIMIT $2 OFFSET $3",
            SHOP_COLUMNS,
            field.column()
        );

        let query = sqlx::query_as::<_, ShopRow>(&sql);
        let query = match field {
            ShopField::TypeId(type_id) => query.bind(type_id),
            ShopField::Name(name) => query.bind(name),
            ShopField::Area(area) => query.bind(area),
        };
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query shops: {}", e)))?;

        Ok(rows.into_iter().map(ShopRow::into_shop).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ShopRow {
    id: i64,
    name: String,
    type_id: i64,
    images: String,
    area: Option<String>,
    address: String,
    x: f64,
    y: f64,
    avg_price: Option<i64>,
    sold: i32,
    comments: i32,
    score: i32,
    open_hours: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShopRow {
    fn into_shop(self) -> Shop {
        Shop {
            id: Some(self.id),
            name: self.name,
            type_id: self.type_id,
            images: self.images,
            area: self.area,
            address: self.address,
            x: self.x,
            y: self.y,
            avg_price: self.avg_price,
            sold: self.sold,
            comments: self.comments,
            score: self.score,
            open_hours: self.open_hours,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_whitelist() {
        assert_eq!(ShopField::parse("type_id", "3").unwrap().column(), "type_id");
        assert_eq!(ShopField::parse("area", "西湖").unwrap().column(), "area");
        assert!(matches!(
            ShopField::parse("type_id", "abc"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ShopField::parse("1 = 1; DROP TABLE shops; --", "x"),
            Err(AppError::Validation(_))
        ));
    }
}
