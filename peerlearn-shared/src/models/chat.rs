/// One-to-one conversations and their messages
///
/// A conversation is keyed by the ordered participant pair
/// (`participant_a < participant_b`), so opening a conversation with someone
/// always lands on the same row regardless of who opens it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE chat_conversations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     participant_a UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     participant_b UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     last_message_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT chat_conversations_pair_key UNIQUE (participant_a, participant_b),
///     CONSTRAINT chat_conversations_ordered CHECK (participant_a < participant_b)
/// );
///
/// CREATE TABLE chat_messages (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     conversation_id UUID NOT NULL REFERENCES chat_conversations(id) ON DELETE CASCADE,
///     sender_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     body TEXT NOT NULL,
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Orders a participant pair the way it is stored
pub fn ordered_pair(x: Uuid, y: Uuid) -> (Uuid, Uuid) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The participant that is not `user_id`
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant_a == user_id {
            self.participant_b
        } else {
            self.participant_a
        }
    }
}

/// Conversation as listed to one participant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub other_user_avatar: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message: Option<String>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

const CONVERSATION_COLUMNS: &str = "id, participant_a, participant_b, last_message_at, created_at";

impl Conversation {
    /// Returns the conversation between two users, creating it if needed
    pub async fn get_or_create(pool: &PgPool, x: Uuid, y: Uuid) -> Result<Self, sqlx::Error> {
        let (a, b) = ordered_pair(x, y);

        // The no-op update makes RETURNING yield the existing row on conflict.
        let sql = format!(
            r#"
            INSERT INTO chat_conversations (participant_a, participant_b)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT chat_conversations_pair_key
                DO UPDATE SET participant_a = EXCLUDED.participant_a
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        );

        sqlx::query_as::<_, Conversation>(&sql)
            .bind(a)
            .bind(b)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM chat_conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        );

        sqlx::query_as::<_, Conversation>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Conversations of a user, most recent activity first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, sqlx::Error> {
        sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.id,
                   p.id AS other_user_id,
                   p.full_name AS other_user_name,
                   p.avatar_url AS other_user_avatar,
                   c.last_message_at,
                   (SELECT m.body FROM chat_messages m
                     WHERE m.conversation_id = c.id
                     ORDER BY m.created_at DESC LIMIT 1) AS last_message,
                   (SELECT COUNT(*) FROM chat_messages m
                     WHERE m.conversation_id = c.id
                       AND m.sender_id <> $1 AND NOT m.is_read) AS unread_count
            FROM chat_conversations c
            JOIN profiles p
              ON p.id = CASE WHEN c.participant_a = $1 THEN c.participant_b ELSE c.participant_a END
            WHERE c.participant_a = $1 OR c.participant_b = $1
            ORDER BY c.last_message_at DESC NULLS LAST, c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn touch(executor: impl PgExecutor<'_>, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chat_conversations SET last_message_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Marks every message sent to `reader_id` in the conversation as read
    pub async fn mark_read(pool: &PgPool, id: Uuid, reader_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_read
            "#,
        )
        .bind(id)
        .bind(reader_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

impl ChatMessage {
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (conversation_id, sender_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, conversation_id, sender_id, body, is_read, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(executor)
        .await
    }

    /// Messages oldest first
    pub async fn list(
        pool: &PgPool,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, conversation_id, sender_id, body, is_read, created_at
            FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_pair_is_symmetric() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        assert_eq!(ordered_pair(x, y), ordered_pair(y, x));
        let (a, b) = ordered_pair(x, y);
        assert!(a <= b);
    }

    #[test]
    fn test_other_participant() {
        let (a, b) = ordered_pair(Uuid::new_v4(), Uuid::new_v4());
        let conversation = Conversation {
            id: Uuid::new_v4(),
            participant_a: a,
            participant_b: b,
            last_message_at: None,
            created_at: Utc::now(),
        };

        assert_eq!(conversation.other_participant(a), b);
        assert_eq!(conversation.other_participant(b), a);
        assert!(conversation.has_participant(a));
        assert!(!conversation.has_participant(Uuid::new_v4()));
    }
}
