//! PostgreSQL 关注 Repository 实现

use async_trait::async_trait;
use review_errors::{AppError, AppResult};
use sqlx::PgPool;

use crate::domain::entities::Follow;
use crate::domain::repositories::FollowRepository;

pub struct PostgresFollowRepository {
    pool: PgPool,
}

impl PostgresFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn insert(&self, follow: &Follow) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO follows (user_id, follow_user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, follow_user_id) DO NOTHING
            "#,
        )
        .bind(follow.user_id)
        .bind(follow.follow_user_id)
        .bind(follow.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save follow: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, user_id: i64, follow_user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND follow_user_id = $2")
            .bind(user_id)
            .bind(follow_user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete follow: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, user_id: i64, follow_user_id: i64) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND follow_user_id = $2)",
        )
        .bind(user_id)
        .bind(follow_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check follow: {}", e)))
    }
}
