/// Scheduled reminders, turned into notifications by the dispatcher
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reminders (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     session_id UUID REFERENCES sessions(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     body TEXT,
///     remind_at TIMESTAMPTZ NOT NULL,
///     sent BOOLEAN NOT NULL DEFAULT FALSE,
///     sent_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_reminders_due ON reminders(remind_at) WHERE sent = FALSE;
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    pub remind_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateReminder {
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    pub remind_at: DateTime<Utc>,
}

const REMINDER_COLUMNS: &str =
    "id, user_id, session_id, title, body, remind_at, sent, sent_at, created_at";

impl Reminder {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateReminder,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO reminders (user_id, session_id, title, body, remind_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            REMINDER_COLUMNS
        );

        sqlx::query_as::<_, Reminder>(&sql)
            .bind(data.user_id)
            .bind(data.session_id)
            .bind(data.title)
            .bind(data.body)
            .bind(data.remind_at)
            .fetch_one(executor)
            .await
    }

    /// Drops the pending reminders of a user for a session
    pub async fn delete_unsent_for_session(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM reminders WHERE user_id = $1 AND session_id = $2 AND sent = FALSE",
        )
        .bind(user_id)
        .bind(session_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Drops every pending reminder of a session (used when it is cancelled)
    pub async fn delete_all_unsent_for_session(
        executor: impl PgExecutor<'_>,
        session_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reminders WHERE session_id = $1 AND sent = FALSE")
            .bind(session_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Re-times every pending reminder of a session after it was edited
    pub async fn reschedule_unsent_for_session(
        executor: impl PgExecutor<'_>,
        session_id: Uuid,
        title: &str,
        body: Option<&str>,
        remind_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reminders SET title = $2, body = $3, remind_at = $4 \
             WHERE session_id = $1 AND sent = FALSE",
        )
        .bind(session_id)
        .bind(title)
        .bind(body)
        .bind(remind_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Pending reminders of a session
    pub async fn list_unsent_for_session(
        executor: impl PgExecutor<'_>,
        session_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM reminders WHERE session_id = $1 AND sent = FALSE ORDER BY created_at",
            REMINDER_COLUMNS
        );

        sqlx::query_as::<_, Reminder>(&sql)
            .bind(session_id)
            .fetch_all(executor)
            .await
    }

    /// Claims up to `limit` due reminders
    ///
    /// Must run inside a transaction: the rows stay locked until commit and
    /// `SKIP LOCKED` lets concurrent dispatchers take disjoint batches.
    pub async fn claim_due(
        executor: impl PgExecutor<'_>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM reminders
            WHERE sent = FALSE AND remind_at <= NOW()
            ORDER BY remind_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
            REMINDER_COLUMNS
        );

        sqlx::query_as::<_, Reminder>(&sql)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    pub async fn mark_sent(executor: impl PgExecutor<'_>, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE reminders SET sent = TRUE, sent_at = NOW() WHERE id = ANY($1)")
                .bind(ids)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }
}
