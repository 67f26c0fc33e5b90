/// Subject model and database operations
///
/// A subject is a course owned by one teacher. New subjects start in
/// `pending` and only appear in the public catalogue once an admin approves
/// them. Deleting a subject sets `deleted_at`; rows are never removed.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE subject_status AS ENUM ('pending', 'approved', 'rejected');
///
/// CREATE TABLE subjects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     teacher_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     university_id UUID REFERENCES universities(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     cover_url VARCHAR(512),
///     status subject_status NOT NULL DEFAULT 'pending',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Moderation state of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subject_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubjectStatus {
    /// Waiting for an admin
    Pending,

    /// Listed publicly
    Approved,

    /// Hidden; the teacher may edit and it returns to pending
    Rejected,
}

impl SubjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectStatus::Pending => "pending",
            SubjectStatus::Approved => "approved",
            SubjectStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub university_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub status: SubjectStatus,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    /// True when students can see, subscribe to and schedule against it
    pub fn is_public(&self) -> bool {
        self.status == SubjectStatus::Approved && self.is_active && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CreateSubject {
    pub teacher_id: Uuid,
    pub university_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubject {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub cover_url: Option<Option<String>>,
    pub university_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// Filters for the public catalogue
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectFilter {
    pub university_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    /// Case-insensitive substring of the title
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SubjectFilter {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// `ILIKE` pattern with the wildcard characters of the query escaped
    pub fn title_pattern(&self) -> Option<String> {
        let q = self.q.as_deref()?.trim();
        if q.is_empty() {
            return None;
        }

        let escaped = q
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}

const SUBJECT_COLUMNS: &str = "id, teacher_id, university_id, title, description, cover_url, \
     status, is_active, deleted_at, created_at, updated_at";

impl Subject {
    /// Inserts a subject in `pending` state
    pub async fn create(pool: &PgPool, data: CreateSubject) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO subjects (teacher_id, university_id, title, description, cover_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(data.teacher_id)
            .bind(data.university_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.cover_url)
            .fetch_one(pool)
            .await
    }

    /// Finds a non-deleted subject by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM subjects WHERE id = $1 AND deleted_at IS NULL",
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Approved, active, non-deleted subjects matching the filter, newest first
    pub async fn list_public(
        pool: &PgPool,
        filter: &SubjectFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM subjects
            WHERE status = 'approved' AND is_active AND deleted_at IS NULL
              AND ($1::uuid IS NULL OR university_id = $1)
              AND ($2::uuid IS NULL OR teacher_id = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(filter.university_id)
            .bind(filter.teacher_id)
            .bind(filter.title_pattern())
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(pool)
            .await
    }

    /// All non-deleted subjects of a teacher, any status
    pub async fn list_by_teacher(pool: &PgPool, teacher_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM subjects WHERE teacher_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC",
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(teacher_id)
            .fetch_all(pool)
            .await
    }

    /// Moderation queue, oldest first
    pub async fn list_by_status(
        pool: &PgPool,
        status: SubjectStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM subjects WHERE status = $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC LIMIT $2 OFFSET $3",
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Updates a subject owned by `teacher_id`
    ///
    /// A rejected subject goes back to `pending` when edited. Returns `None`
    /// when the subject does not exist, is deleted or belongs to someone else.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        teacher_id: Uuid,
        data: UpdateSubject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE subjects SET
                title = COALESCE($3, title),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                cover_url = CASE WHEN $6 THEN $7 ELSE cover_url END,
                university_id = CASE WHEN $8 THEN $9 ELSE university_id END,
                is_active = COALESCE($10, is_active),
                status = CASE WHEN status = 'rejected' THEN 'pending'::subject_status ELSE status END,
                updated_at = NOW()
            WHERE id = $1 AND teacher_id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(id)
            .bind(teacher_id)
            .bind(data.title)
            .bind(data.description.is_some())
            .bind(data.description.flatten())
            .bind(data.cover_url.is_some())
            .bind(data.cover_url.flatten())
            .bind(data.university_id.is_some())
            .bind(data.university_id.flatten())
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deletes a subject owned by `teacher_id`
    pub async fn soft_delete(pool: &PgPool, id: Uuid, teacher_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE subjects SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND teacher_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(teacher_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the moderation status
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: SubjectStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE subjects SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            SUBJECT_COLUMNS
        );

        sqlx::query_as::<_, Subject>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(SubjectStatus, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (SubjectStatus, i64)>(
            "SELECT status, COUNT(*) FROM subjects WHERE deleted_at IS NULL GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_limits() {
        let filter = SubjectFilter::default();
        assert_eq!(filter.limit(), 20);
        assert_eq!(filter.offset(), 0);

        let filter = SubjectFilter {
            limit: Some(1000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(filter.limit(), 100);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_title_pattern_escapes_wildcards() {
        let filter = SubjectFilter {
            q: Some(" 100%_calc ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.title_pattern().as_deref(), Some("%100\\%\\_calc%"));

        let blank = SubjectFilter {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.title_pattern().is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SubjectStatus::Approved).unwrap(),
            "\"approved\""
        );
    }
}
