/// Direct messaging endpoints
///
/// # Endpoints
///
/// - `GET /v1/chat/conversations` - Caller's conversations with unread counts
/// - `POST /v1/chat/conversations` - Open (get or create) a conversation
/// - `GET /v1/chat/conversations/:id/messages` - Oldest first, paginated
/// - `POST /v1/chat/conversations/:id/messages` - Send; pushes a realtime
///   event and a `message` notification to the other participant
/// - `POST /v1/chat/conversations/:id/read` - Mark incoming messages read

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::Pagination,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::{
        chat::{ChatMessage, Conversation, ConversationSummary},
        notification::{CreateNotification, NotificationKind},
        profile::Profile,
    },
    notify,
    realtime::RealtimePayload,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

/// Characters of a message repeated in its notification body
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Deserialize)]
pub struct OpenConversationRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: u64,
}

/// Loads a conversation the caller takes part in; otherwise 404
async fn load_conversation(pool: &PgPool, id: Uuid, user_id: Uuid) -> ApiResult<Conversation> {
    Conversation::find_by_id(pool, id)
        .await?
        .filter(|c| c.has_participant(user_id))
        .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))
}

fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    Ok(Json(
        Conversation::list_for_user(&state.db, auth.user_id).await?,
    ))
}

pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<OpenConversationRequest>,
) -> ApiResult<Json<Conversation>> {
    if req.user_id == auth.user_id {
        return Err(ApiError::BadRequest(
            "Cannot start a conversation with yourself".to_string(),
        ));
    }

    match Profile::find_by_id(&state.db, req.user_id).await? {
        Some(profile) if profile.is_active => {}
        _ => return Err(ApiError::NotFound("User not found".to_string())),
    }

    let conversation = Conversation::get_or_create(&state.db, auth.user_id, req.user_id).await?;
    Ok(Json(conversation))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    load_conversation(&state.db, id, auth.user_id).await?;

    Ok(Json(
        ChatMessage::list(&state.db, id, page.limit(), page.offset()).await?,
    ))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    req.validate()?;
    if req.body.trim().is_empty() {
        return Err(ApiError::invalid_field("body", "Message cannot be blank"));
    }

    let conversation = load_conversation(&state.db, id, auth.user_id).await?;
    let recipient = conversation.other_participant(auth.user_id);

    let mut tx = state.db.begin().await?;
    let message = ChatMessage::insert(&mut *tx, id, auth.user_id, &req.body).await?;
    Conversation::touch(&mut *tx, id).await?;
    tx.commit().await?;

    let delivered = state
        .hub
        .publish(recipient, RealtimePayload::ChatMessage(message.clone()));
    debug!(conversation_id = %id, delivered, "Chat message published");

    let sender_name = Profile::find_by_id(&state.db, auth.user_id)
        .await?
        .map(|p| p.full_name)
        .unwrap_or_else(|| "Someone".to_string());

    notify::notify_logged(
        &state.db,
        &state.hub,
        CreateNotification::new(
            recipient,
            NotificationKind::Message,
            format!("New message from {}", sender_name),
        )
        .with_body(preview(&message.body))
        .with_link(format!("/chat/{}", id)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MarkReadResponse>> {
    load_conversation(&state.db, id, auth.user_id).await?;
    let marked = Conversation::mark_read(&state.db, id, auth.user_id).await?;
    Ok(Json(MarkReadResponse { marked }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_messages() {
        assert_eq!(preview("hi"), "hi");

        let long = "é".repeat(PREVIEW_CHARS + 5);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn test_empty_message_rejected() {
        let req = SendMessageRequest {
            body: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
