/// Subject subscriptions paid with points
///
/// One row per (subject, student). Renewing extends `expires_at` on the same
/// row. The payment itself lives in [`crate::billing`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subject_subscriptions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     subject_id UUID NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
///     student_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     points_paid INTEGER NOT NULL CHECK (points_paid >= 0),
///     starts_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT subject_subscriptions_subject_student_key UNIQUE (subject_id, student_id)
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub student_id: Uuid,
    /// Total points paid across all renewals
    pub points_paid: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription as listed to its student
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub subject_title: String,
    pub points_paid: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Expiry after paying for another `duration_days`
///
/// A live subscription is extended from its current expiry; a lapsed or new
/// one starts from `now`.
pub fn next_expiry(
    now: DateTime<Utc>,
    current_expiry: Option<DateTime<Utc>>,
    duration_days: i32,
) -> DateTime<Utc> {
    let base = match current_expiry {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };
    base + Duration::days(i64::from(duration_days))
}

const SUBSCRIPTION_COLUMNS: &str =
    "id, subject_id, student_id, points_paid, starts_at, expires_at, created_at, updated_at";

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub async fn find(
        executor: impl PgExecutor<'_>,
        subject_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM subject_subscriptions WHERE subject_id = $1 AND student_id = $2",
            SUBSCRIPTION_COLUMNS
        );

        sqlx::query_as::<_, Subscription>(&sql)
            .bind(subject_id)
            .bind(student_id)
            .fetch_optional(executor)
            .await
    }

    /// Creates the subscription or extends it to `expires_at`
    ///
    /// `starts_at` is reset only when the previous period had lapsed.
    pub async fn upsert(
        executor: impl PgExecutor<'_>,
        subject_id: Uuid,
        student_id: Uuid,
        points: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO subject_subscriptions (subject_id, student_id, points_paid, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT subject_subscriptions_subject_student_key DO UPDATE
                SET points_paid = subject_subscriptions.points_paid + EXCLUDED.points_paid,
                    starts_at = CASE
                        WHEN subject_subscriptions.expires_at > NOW() THEN subject_subscriptions.starts_at
                        ELSE NOW()
                    END,
                    expires_at = EXCLUDED.expires_at,
                    updated_at = NOW()
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );

        sqlx::query_as::<_, Subscription>(&sql)
            .bind(subject_id)
            .bind(student_id)
            .bind(points)
            .bind(expires_at)
            .fetch_one(executor)
            .await
    }

    pub async fn is_active_subscriber(
        pool: &PgPool,
        subject_id: Uuid,
        student_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM subject_subscriptions
                WHERE subject_id = $1 AND student_id = $2 AND expires_at > NOW()
            )
            "#,
        )
        .bind(subject_id)
        .bind(student_id)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> Result<Vec<SubscriptionView>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionView>(
            r#"
            SELECT ss.id, ss.subject_id, s.title AS subject_title, ss.points_paid,
                   ss.starts_at, ss.expires_at, ss.expires_at > NOW() AS is_active
            FROM subject_subscriptions ss
            JOIN subjects s ON s.id = ss.subject_id
            WHERE ss.student_id = $1
            ORDER BY ss.expires_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// Students with a live subscription to the subject
    pub async fn active_subscriber_ids(
        pool: &PgPool,
        subject_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT student_id FROM subject_subscriptions WHERE subject_id = $1 AND expires_at > NOW()",
        )
        .bind(subject_id)
        .fetch_all(pool)
        .await
    }

    /// Live subscriptions across all subjects of a teacher
    pub async fn count_active_for_teacher(pool: &PgPool, teacher_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM subject_subscriptions ss
            JOIN subjects s ON s.id = ss.subject_id
            WHERE s.teacher_id = $1 AND ss.expires_at > NOW()
            "#,
        )
        .bind(teacher_id)
        .fetch_one(pool)
        .await
    }

    /// Total points ever paid for subscriptions
    pub async fn total_points_spent(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(points_paid), 0)::BIGINT FROM subject_subscriptions",
        )
        .fetch_one(pool)
        .await
    }
}
