//! PostgreSQL 店铺类型 Repository 实现

use async_trait::async_trait;
use review_errors::{AppError, AppResult};
use sqlx::PgPool;

use crate::domain::entities::ShopType;
use crate::domain::repositories::ShopTypeRepository;

pub struct PostgresShopTypeRepository {
    pool: PgPool,
}

impl PostgresShopTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShopTypeRepository for PostgresShopTypeRepository {
    async fn list_ordered(&self) -> AppResult<Vec<ShopType>> {
        let rows = sqlx::query_as::<_, ShopTypeRow>(
            r#"
            SELECT id, name, icon, sort
            FROM shop_types
            ORDER BY sort ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list shop types: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| ShopType {
                id: r.id,
                name: r.name,
                icon: r.icon,
                sort: r.sort,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct ShopTypeRow {
    id: i64,
    name: String,
    icon: String,
    sort: i32,
}
