/// Personal to-do items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub is_completed: Option<bool>,
}

const TODO_COLUMNS: &str = "id, owner_id, title, due_at, is_completed, created_at, updated_at";

impl Todo {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        title: &str,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO todos (owner_id, title, due_at) VALUES ($1, $2, $3) RETURNING {}",
            TODO_COLUMNS
        );

        sqlx::query_as::<_, Todo>(&sql)
            .bind(owner_id)
            .bind(title)
            .bind(due_at)
            .fetch_one(pool)
            .await
    }

    /// Open items first, then by due date (undated last)
    pub async fn list(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM todos WHERE owner_id = $1 \
             ORDER BY is_completed ASC, due_at ASC NULLS LAST, created_at DESC",
            TODO_COLUMNS
        );

        sqlx::query_as::<_, Todo>(&sql)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTodo,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE todos SET
                title = COALESCE($3, title),
                due_at = CASE WHEN $4 THEN $5 ELSE due_at END,
                is_completed = COALESCE($6, is_completed),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            TODO_COLUMNS
        );

        sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(data.title)
            .bind(data.due_at.is_some())
            .bind(data.due_at.flatten())
            .bind(data.is_completed)
            .fetch_optional(pool)
            .await
    }

    /// Flips `is_completed`
    pub async fn toggle(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE todos SET is_completed = NOT is_completed, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TODO_COLUMNS
        );

        sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
