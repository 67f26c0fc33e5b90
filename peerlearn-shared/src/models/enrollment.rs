/// Enrollments of students in sessions
///
/// `(session_id, student_id)` is unique (`enrollments_session_student_key`),
/// which is what turns a double enrollment into a 409.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::session::SessionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Enrollment joined with its session, for "my sessions"
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnrollmentView {
    pub id: Uuid,
    pub session_id: Uuid,
    pub session_title: String,
    pub teacher_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub meeting_url: Option<String>,
    pub status: SessionStatus,
    pub enrolled_at: DateTime<Utc>,
}

/// One line of a session roster
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RosterEntry {
    pub student_id: Uuid,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        session_id: Uuid,
        student_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (session_id, student_id)
            VALUES ($1, $2)
            RETURNING id, session_id, student_id, created_at
            "#,
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_one(executor)
        .await
    }

    /// Removes an enrollment; returns false if there was none
    pub async fn delete(
        executor: impl PgExecutor<'_>,
        session_id: Uuid,
        student_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM enrollments WHERE session_id = $1 AND student_id = $2")
            .bind(session_id)
            .bind(student_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_session(
        executor: impl PgExecutor<'_>,
        session_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(executor)
            .await
    }

    pub async fn exists(
        pool: &PgPool,
        session_id: Uuid,
        student_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM enrollments WHERE session_id = $1 AND student_id = $2)",
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> Result<Vec<EnrollmentView>, sqlx::Error> {
        sqlx::query_as::<_, EnrollmentView>(
            r#"
            SELECT e.id, e.session_id, s.title AS session_title, s.teacher_id, s.scheduled_at,
                   s.duration_minutes, s.meeting_url, s.status, e.created_at AS enrolled_at
            FROM enrollments e
            JOIN sessions s ON s.id = e.session_id
            WHERE e.student_id = $1
            ORDER BY s.scheduled_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    pub async fn roster(pool: &PgPool, session_id: Uuid) -> Result<Vec<RosterEntry>, sqlx::Error> {
        sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT p.id AS student_id, p.full_name, p.avatar_url, e.created_at AS enrolled_at
            FROM enrollments e
            JOIN profiles p ON p.id = e.student_id
            WHERE e.session_id = $1
            ORDER BY e.created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }

    pub async fn student_ids(pool: &PgPool, session_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>("SELECT student_id FROM enrollments WHERE session_id = $1")
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments")
            .fetch_one(pool)
            .await
    }

    /// Distinct students ever enrolled in any of the teacher's sessions
    pub async fn count_distinct_students_for_teacher(
        pool: &PgPool,
        teacher_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT e.student_id)
            FROM enrollments e
            JOIN sessions s ON s.id = e.session_id
            WHERE s.teacher_id = $1
            "#,
        )
        .bind(teacher_id)
        .fetch_one(pool)
        .await
    }
}
