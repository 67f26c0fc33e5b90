/// Posts a teacher publishes to the subscribers of a subject

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubjectPost {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSubjectPost {
    pub subject_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub attachment_url: Option<String>,
}

impl SubjectPost {
    pub async fn create(pool: &PgPool, data: CreateSubjectPost) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SubjectPost>(
            r#"
            INSERT INTO subject_posts (subject_id, author_id, title, body, attachment_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, subject_id, author_id, title, body, attachment_url, created_at, updated_at
            "#,
        )
        .bind(data.subject_id)
        .bind(data.author_id)
        .bind(data.title)
        .bind(data.body)
        .bind(data.attachment_url)
        .fetch_one(pool)
        .await
    }

    /// Non-deleted posts of a subject, newest first
    pub async fn list_for_subject(
        pool: &PgPool,
        subject_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubjectPost>(
            r#"
            SELECT id, subject_id, author_id, title, body, attachment_url, created_at, updated_at
            FROM subject_posts
            WHERE subject_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(subject_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Soft-deletes a post written by `author_id`
    pub async fn soft_delete(pool: &PgPool, id: Uuid, author_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE subject_posts SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND author_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
