/// Price of a subject subscription in points
///
/// One row per subject; a subject without a row cannot be subscribed to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubjectPrice {
    pub subject_id: Uuid,
    pub price_points: i32,
    /// Length of one subscription period
    pub duration_days: i32,
    pub updated_at: DateTime<Utc>,
}

impl SubjectPrice {
    /// Inserts or replaces the price of a subject
    pub async fn upsert(
        pool: &PgPool,
        subject_id: Uuid,
        price_points: i32,
        duration_days: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SubjectPrice>(
            r#"
            INSERT INTO subject_prices (subject_id, price_points, duration_days)
            VALUES ($1, $2, $3)
            ON CONFLICT (subject_id) DO UPDATE
                SET price_points = EXCLUDED.price_points,
                    duration_days = EXCLUDED.duration_days,
                    updated_at = NOW()
            RETURNING subject_id, price_points, duration_days, updated_at
            "#,
        )
        .bind(subject_id)
        .bind(price_points)
        .bind(duration_days)
        .fetch_one(pool)
        .await
    }

    pub async fn find(
        executor: impl PgExecutor<'_>,
        subject_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubjectPrice>(
            "SELECT subject_id, price_points, duration_days, updated_at \
             FROM subject_prices WHERE subject_id = $1",
        )
        .bind(subject_id)
        .fetch_optional(executor)
        .await
    }
}
