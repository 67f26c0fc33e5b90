/// To-do endpoints, scoped to the caller

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::double_option,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::todo::{Todo, UpdateTodo},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTodoRequest {
    #[validate(length(min = 1, max = 300, message = "Title must be 1-300 characters"))]
    pub title: String,

    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTodoRequest {
    #[validate(length(min = 1, max = 300, message = "Title must be 1-300 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_at: Option<Option<DateTime<Utc>>>,

    pub is_completed: Option<bool>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Todo not found".to_string())
}

pub async fn list_todos(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Todo>>> {
    Ok(Json(Todo::list(&state.db, auth.user_id).await?))
}

pub async fn create_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTodoRequest>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    req.validate()?;
    let todo = Todo::create(&state.db, auth.user_id, req.title.trim(), req.due_at).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTodoRequest>,
) -> ApiResult<Json<Todo>> {
    req.validate()?;

    Todo::update(
        &state.db,
        id,
        auth.user_id,
        UpdateTodo {
            title: req.title.map(|t| t.trim().to_string()),
            due_at: req.due_at,
            is_completed: req.is_completed,
        },
    )
    .await?
    .map(Json)
    .ok_or_else(not_found)
}

pub async fn toggle_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Todo>> {
    Todo::toggle(&state.db, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Todo::delete(&state.db, id, auth.user_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_rejected() {
        let req = CreateTodoRequest {
            title: String::new(),
            due_at: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_clears_due_date() {
        let req: UpdateTodoRequest = serde_json::from_str(r#"{"due_at": null}"#).unwrap();
        assert_eq!(req.due_at, Some(None));
        assert_eq!(req.is_completed, None);
    }
}
