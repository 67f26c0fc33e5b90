/// Private note endpoints
///
/// All scoped to the caller; another user's note is a 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, subjects::load_subject},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::note::{Note, UpdateNote},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct NoteQuery {
    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 100000, message = "Content must be at most 100000 characters"))]
    #[serde(default)]
    pub content: String,

    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNoteRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 100000, message = "Content must be at most 100000 characters"))]
    pub content: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub subject_id: Option<Option<Uuid>>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Note not found".to_string())
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NoteQuery>,
) -> ApiResult<Json<Vec<Note>>> {
    Ok(Json(
        Note::list(&state.db, auth.user_id, query.subject_id).await?,
    ))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    req.validate()?;
    if let Some(subject_id) = req.subject_id {
        load_subject(&state.db, subject_id).await?;
    }

    let note = Note::create(
        &state.db,
        auth.user_id,
        req.subject_id,
        req.title.trim(),
        &req.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Note>> {
    Note::find(&state.db, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<Note>> {
    req.validate()?;
    if let Some(Some(subject_id)) = req.subject_id {
        load_subject(&state.db, subject_id).await?;
    }

    Note::update(
        &state.db,
        id,
        auth.user_id,
        UpdateNote {
            title: req.title.map(|t| t.trim().to_string()),
            content: req.content,
            subject_id: req.subject_id,
        },
    )
    .await?
    .map(Json)
    .ok_or_else(not_found)
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Note::soft_delete(&state.db, id, auth.user_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_note_content_defaults_empty() {
        let req: CreateNoteRequest = serde_json::from_str(r#"{"title": "Limits"}"#).unwrap();
        assert_eq!(req.content, "");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_note_can_detach_subject() {
        let req: UpdateNoteRequest = serde_json::from_str(r#"{"subject_id": null}"#).unwrap();
        assert_eq!(req.subject_id, Some(None));
    }
}
