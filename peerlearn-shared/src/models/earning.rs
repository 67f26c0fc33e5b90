/// Teacher earnings ledger
///
/// Append-only: one row per payment that credited a teacher, with the
/// platform commission already split off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// What produced an earning
pub const SOURCE_SUBSCRIPTION: &str = "subscription";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeacherEarning {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub source: String,
    pub gross_amount: i64,
    pub commission_amount: i64,
    pub net_amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEarning {
    pub teacher_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub source: String,
    pub gross_amount: i64,
    pub commission_amount: i64,
    pub net_amount: i64,
}

const EARNING_COLUMNS: &str = "id, teacher_id, subscription_id, source, gross_amount, \
     commission_amount, net_amount, created_at";

impl TeacherEarning {
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        data: CreateEarning,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO teacher_earnings (teacher_id, subscription_id, source,
                                          gross_amount, commission_amount, net_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            EARNING_COLUMNS
        );

        sqlx::query_as::<_, TeacherEarning>(&sql)
            .bind(data.teacher_id)
            .bind(data.subscription_id)
            .bind(data.source)
            .bind(data.gross_amount)
            .bind(data.commission_amount)
            .bind(data.net_amount)
            .fetch_one(executor)
            .await
    }

    pub async fn list_for_teacher(
        pool: &PgPool,
        teacher_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM teacher_earnings WHERE teacher_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            EARNING_COLUMNS
        );

        sqlx::query_as::<_, TeacherEarning>(&sql)
            .bind(teacher_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Sum of net earnings of a teacher
    pub async fn total_net(
        executor: impl PgExecutor<'_>,
        teacher_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(net_amount), 0)::BIGINT FROM teacher_earnings WHERE teacher_id = $1",
        )
        .bind(teacher_id)
        .fetch_one(executor)
        .await
    }

    /// Platform-wide (gross, commission, net) totals
    pub async fn platform_totals(pool: &PgPool) -> Result<(i64, i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COALESCE(SUM(gross_amount), 0)::BIGINT,
                   COALESCE(SUM(commission_amount), 0)::BIGINT,
                   COALESCE(SUM(net_amount), 0)::BIGINT
            FROM teacher_earnings
            "#,
        )
        .fetch_one(pool)
        .await
    }
}
