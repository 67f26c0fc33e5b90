/// Session reviews left by enrolled students

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    /// 1 to 5
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reviewer display name alongside the review
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub student_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingSummary {
    /// `None` when the teacher has no reviews yet
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone)]
pub struct CreateReview {
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

impl Review {
    /// Inserts a review; a second review of the same session by the same
    /// student violates `reviews_session_student_key`
    pub async fn create(pool: &PgPool, data: CreateReview) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (session_id, student_id, teacher_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, session_id, student_id, teacher_id, rating, comment, created_at
            "#,
        )
        .bind(data.session_id)
        .bind(data.student_id)
        .bind(data.teacher_id)
        .bind(data.rating)
        .bind(data.comment)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_teacher(
        pool: &PgPool,
        teacher_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReviewView>, sqlx::Error> {
        sqlx::query_as::<_, ReviewView>(
            r#"
            SELECT r.id, r.session_id, r.student_id, r.teacher_id, r.rating, r.comment,
                   r.created_at, p.full_name AS student_name
            FROM reviews r
            JOIN profiles p ON p.id = r.student_id
            WHERE r.teacher_id = $1
            ORDER BY r.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(teacher_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn summary_for_teacher(
        pool: &PgPool,
        teacher_id: Uuid,
    ) -> Result<RatingSummary, sqlx::Error> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT AVG(rating)::FLOAT8 AS average_rating, COUNT(*) AS review_count
            FROM reviews WHERE teacher_id = $1
            "#,
        )
        .bind(teacher_id)
        .fetch_one(pool)
        .await
    }
}
