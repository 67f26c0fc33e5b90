/// Applications for the teacher role
///
/// A user may have at most one `pending` application, enforced by the
/// partial unique index `teacher_applications_one_pending_key`. Reviews only
/// apply to pending rows, so a decided application cannot be decided again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeacherApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub qualifications: String,
    /// Subjects the applicant wants to teach, free text
    pub subjects: Vec<String>,
    pub document_url: Option<String>,
    pub status: ApplicationStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateApplication {
    pub user_id: Uuid,
    pub bio: String,
    pub qualifications: String,
    pub subjects: Vec<String>,
    pub document_url: Option<String>,
}

const APPLICATION_COLUMNS: &str = "id, user_id, bio, qualifications, subjects, document_url, \
     status, reviewed_by, reviewed_at, review_notes, created_at, updated_at";

impl TeacherApplication {
    /// Files an application; a second pending one violates
    /// `teacher_applications_one_pending_key`
    pub async fn create(pool: &PgPool, data: CreateApplication) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO teacher_applications (user_id, bio, qualifications, subjects, document_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            APPLICATION_COLUMNS
        );

        sqlx::query_as::<_, TeacherApplication>(&sql)
            .bind(data.user_id)
            .bind(data.bio)
            .bind(data.qualifications)
            .bind(data.subjects)
            .bind(data.document_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM teacher_applications WHERE id = $1",
            APPLICATION_COLUMNS
        );

        sqlx::query_as::<_, TeacherApplication>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM teacher_applications WHERE user_id = $1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        );

        sqlx::query_as::<_, TeacherApplication>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Oldest first, optionally narrowed to one status
    pub async fn list(
        pool: &PgPool,
        status: Option<ApplicationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM teacher_applications WHERE ($1::application_status IS NULL OR status = $1) \
             ORDER BY created_at ASC LIMIT $2 OFFSET $3",
            APPLICATION_COLUMNS
        );

        sqlx::query_as::<_, TeacherApplication>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Records the decision on a pending application
    ///
    /// Returns `None` when the application is missing or no longer pending.
    pub async fn review(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        reviewer_id: Uuid,
        decision: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE teacher_applications
            SET status = $3, reviewed_by = $2, reviewed_at = NOW(),
                review_notes = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );

        sqlx::query_as::<_, TeacherApplication>(&sql)
            .bind(id)
            .bind(reviewer_id)
            .bind(decision)
            .bind(notes)
            .fetch_optional(executor)
            .await
    }
}
