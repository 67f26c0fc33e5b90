/// In-app notifications
///
/// Rows are created through [`crate::notify`], which also pushes the new
/// notification to the recipient's realtime stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Notification kinds emitted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    Enrollment,
    SessionCancelled,
    SessionReminder,
    SubjectReviewed,
    SubjectPost,
    ApplicationReviewed,
    WithdrawalUpdated,
    QuizPassed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Message => "message",
            NotificationKind::Enrollment => "enrollment",
            NotificationKind::SessionCancelled => "session_cancelled",
            NotificationKind::SessionReminder => "session_reminder",
            NotificationKind::SubjectReviewed => "subject_reviewed",
            NotificationKind::SubjectPost => "subject_post",
            NotificationKind::ApplicationReviewed => "application_reviewed",
            NotificationKind::WithdrawalUpdated => "withdrawal_updated",
            NotificationKind::QuizPassed => "quiz_passed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    /// One of [`NotificationKind`], stored as text
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

impl CreateNotification {
    pub fn new(user_id: Uuid, kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            body: None,
            link: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, body, link, is_read, created_at";

impl Notification {
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        data: CreateNotification,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO notifications (user_id, kind, title, body, link) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(data.user_id)
            .bind(data.kind.as_str())
            .bind(data.title)
            .bind(data.body)
            .bind(data.link)
            .fetch_one(executor)
            .await
    }

    /// Newest first
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT is_read) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Marks one notification read; false when it is not the user's
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_match_serde() {
        for kind in [
            NotificationKind::Message,
            NotificationKind::SessionCancelled,
            NotificationKind::WithdrawalUpdated,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_builder() {
        let user = Uuid::new_v4();
        let n = CreateNotification::new(user, NotificationKind::Enrollment, "New student")
            .with_body("Ada joined")
            .with_link("/sessions/1");
        assert_eq!(n.user_id, user);
        assert_eq!(n.body.as_deref(), Some("Ada joined"));
        assert_eq!(n.link.as_deref(), Some("/sessions/1"));
    }
}
