/// Withdrawal requests against a teacher's earnings
///
/// Status moves forward only:
///
/// ```text
/// pending ──► approved ──► paid
///    │           │
///    └───────────┴──────► rejected
/// ```
///
/// Pending, approved and paid requests all count against the available
/// balance; a rejected request releases its amount.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "withdrawal_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Paid => "paid",
        }
    }

    /// Whether a request in this status holds funds
    pub fn reserves_funds(&self) -> bool {
        !matches!(self, WithdrawalStatus::Rejected)
    }

    pub fn can_transition_to(&self, target: WithdrawalStatus) -> bool {
        matches!(
            (self, target),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Paid)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub amount: i64,
    /// Payout channel, e.g. "bank_transfer"
    pub method: String,
    pub account_details: String,
    pub status: WithdrawalStatus,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWithdrawal {
    pub teacher_id: Uuid,
    pub amount: i64,
    pub method: String,
    pub account_details: String,
}

/// Withdrawn amounts of a teacher grouped by status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct WithdrawalTotals {
    pub pending: i64,
    pub approved: i64,
    pub paid: i64,
}

impl WithdrawalTotals {
    /// Amount no longer available for new requests
    pub fn reserved(&self) -> i64 {
        self.pending + self.approved + self.paid
    }
}

const WITHDRAWAL_COLUMNS: &str = "id, teacher_id, amount, method, account_details, status, \
     processed_by, processed_at, admin_notes, created_at, updated_at";

impl WithdrawalRequest {
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        data: CreateWithdrawal,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO withdrawal_requests (teacher_id, amount, method, account_details) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            WITHDRAWAL_COLUMNS
        );

        sqlx::query_as::<_, WithdrawalRequest>(&sql)
            .bind(data.teacher_id)
            .bind(data.amount)
            .bind(data.method)
            .bind(data.account_details)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM withdrawal_requests WHERE id = $1",
            WITHDRAWAL_COLUMNS
        );

        sqlx::query_as::<_, WithdrawalRequest>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn totals_for_teacher(
        executor: impl PgExecutor<'_>,
        teacher_id: Uuid,
    ) -> Result<WithdrawalTotals, sqlx::Error> {
        sqlx::query_as::<_, WithdrawalTotals>(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0)::BIGINT AS pending,
                   COALESCE(SUM(amount) FILTER (WHERE status = 'approved'), 0)::BIGINT AS approved,
                   COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0)::BIGINT AS paid
            FROM withdrawal_requests
            WHERE teacher_id = $1
            "#,
        )
        .bind(teacher_id)
        .fetch_one(executor)
        .await
    }

    pub async fn list_for_teacher(pool: &PgPool, teacher_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM withdrawal_requests WHERE teacher_id = $1 ORDER BY created_at DESC",
            WITHDRAWAL_COLUMNS
        );

        sqlx::query_as::<_, WithdrawalRequest>(&sql)
            .bind(teacher_id)
            .fetch_all(pool)
            .await
    }

    /// Admin queue, oldest first
    pub async fn list(
        pool: &PgPool,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM withdrawal_requests WHERE ($1::withdrawal_status IS NULL OR status = $1) \
             ORDER BY created_at ASC LIMIT $2 OFFSET $3",
            WITHDRAWAL_COLUMNS
        );

        sqlx::query_as::<_, WithdrawalRequest>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Moves a request from `from` to `target`
    ///
    /// Returns `None` if the status changed concurrently.
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: WithdrawalStatus,
        target: WithdrawalStatus,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE withdrawal_requests
            SET status = $3, processed_by = $4, processed_at = NOW(),
                admin_notes = COALESCE($5, admin_notes), updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        );

        sqlx::query_as::<_, WithdrawalRequest>(&sql)
            .bind(id)
            .bind(from)
            .bind(target)
            .bind(admin_id)
            .bind(notes)
            .fetch_optional(pool)
            .await
    }

    /// Platform-wide sum of withdrawals in `status`
    pub async fn total_by_status(pool: &PgPool, status: WithdrawalStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM withdrawal_requests WHERE status = $1",
        )
        .bind(status)
        .fetch_one(pool)
        .await
    }
}
