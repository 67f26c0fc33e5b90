/// University endpoints
///
/// - `GET /v1/universities` - List (public)
/// - `POST /v1/universities` - Create (admin)

use crate::{app::AppState, error::ApiResult, routes::non_blank};
use axum::{extract::State, http::StatusCode, Extension, Json};
use peerlearn_shared::{
    auth::{authorization::require_current_role, middleware::AuthContext},
    models::{role::AppRole, university::University},
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUniversityRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,
}

pub async fn list_universities(State(state): State<AppState>) -> ApiResult<Json<Vec<University>>> {
    Ok(Json(University::list(&state.db).await?))
}

pub async fn create_university(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUniversityRequest>,
) -> ApiResult<(StatusCode, Json<University>)> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    req.validate()?;

    let country = non_blank(req.country);
    let university = University::create(&state.db, req.name.trim(), country.as_deref()).await?;

    tracing::info!(university_id = %university.id, "University created");
    Ok((StatusCode::CREATED, Json(university)))
}
