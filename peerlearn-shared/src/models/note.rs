/// Private study notes
///
/// Every query is scoped by `owner_id`, so a note belonging to someone else
/// behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subject_id: Option<Option<Uuid>>,
}

const NOTE_COLUMNS: &str = "id, owner_id, subject_id, title, content, created_at, updated_at";

impl Note {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        subject_id: Option<Uuid>,
        title: &str,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO notes (owner_id, subject_id, title, content) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&sql)
            .bind(owner_id)
            .bind(subject_id)
            .bind(title)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    pub async fn find(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM notes WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL",
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recently edited first, optionally narrowed to one subject
    pub async fn list(
        pool: &PgPool,
        owner_id: Uuid,
        subject_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM notes WHERE owner_id = $1 AND deleted_at IS NULL \
             AND ($2::uuid IS NULL OR subject_id = $2) ORDER BY updated_at DESC",
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&sql)
            .bind(owner_id)
            .bind(subject_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateNote,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE notes SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                subject_id = CASE WHEN $5 THEN $6 ELSE subject_id END,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            NOTE_COLUMNS
        );

        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(data.title)
            .bind(data.content)
            .bind(data.subject_id.is_some())
            .bind(data.subject_id.flatten())
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notes SET deleted_at = NOW() WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
