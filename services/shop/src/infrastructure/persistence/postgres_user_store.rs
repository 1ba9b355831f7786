//! PostgreSQL 用户存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review_common::Pagination;
use review_errors::{AppError, AppResult};
use review_ports::RecordStore;
use sqlx::PgPool;

use super::limit_offset;
use crate::domain::entities::User;

pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 可以按等值查询的列
fn user_column(field: &str) -> AppResult<&'static str> {
    match field {
        "phone" => Ok("phone"),
        "nick_name" => Ok("nick_name"),
        other => Err(AppError::validation(format!(
            "Unsupported user query field: {}",
            other
        ))),
    }
}

#[async_trait]
impl RecordStore<User> for PostgresUserStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, phone, nick_name, icon, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        Ok(row.map(UserRow::into_user))
    }

    async fn save(&self, user: &User) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (phone, nick_name, icon)
            VALUES ($1, $2, $3)
            RETURNING id, phone, nick_name, icon, created_at
            "#,
        )
        .bind(&user.phone)
        .bind(&user.nick_name)
        .bind(&user.icon)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save user: {}", e)))?;

        Ok(row.into_user())
    }

    async fn update(&self, user: &User) -> AppResult<bool> {
        let Some(id) = user.id else {
            return Err(AppError::validation("user id is required"));
        };

        let result = sqlx::query(
            r#"
            UPDATE users SET phone = $2, nick_name = $3, icon = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&user.phone)
        .bind(&user.nick_name)
        .bind(&user.icon)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_ids(&self, ids: &[i64]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, phone, nick_name, icon, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list users: {}", e)))?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<User>> {
        let column = user_column(field)?;
        let (limit, offset) = limit_offset(pagination);
        let sql = format!(
            "SELECT id, phone, nick_name, icon, created_at FROM users \
             WHERE {} = $1 ORDER BY id LIMIT $2 OFFSET $3",
            column
        );

        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query users: {}", e)))?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    phone: String,
    nick_name: String,
    icon: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: Some(self.id),
            phone: self.phone,
            nick_name: self.nick_name,
            icon: self.icon,
            created_at: Some(self.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_column_whitelist() {
        assert_eq!(user_column("phone").unwrap(), "phone");
        assert!(matches!(user_column("password"), Err(AppError::Validation(_))));
    }
}
