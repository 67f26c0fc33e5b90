/// Profile endpoints
///
/// - `GET /v1/profiles/me` - Own profile, including email and points
/// - `PATCH /v1/profiles/me` - Update name, bio, avatar, university
/// - `GET /v1/profiles/me/points` - Points balance
/// - `GET /v1/profiles/:id` - Public view of any profile (no email)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::double_option,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::{
        profile::{Profile, PublicProfile, UpdateProfile},
        role::{AppRole, UserRole},
        university::University,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Own profile with its roles
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub roles: Vec<AppRole>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub full_name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub university_id: Option<Option<Uuid>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResponse {
    pub points: i32,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let profile = Profile::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
    let roles = UserRole::roles_for(&state.db, auth.user_id).await?;

    Ok(Json(MeResponse { profile, roles }))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    req.validate()?;

    if let Some(Some(bio)) = &req.bio {
        if bio.chars().count() > 2000 {
            return Err(ApiError::invalid_field("bio", "Bio must be at most 2000 characters"));
        }
    }

    if let Some(Some(university_id)) = req.university_id {
        if !University::exists(&state.db, university_id).await? {
            return Err(ApiError::invalid_field("university_id", "Unknown university"));
        }
    }

    let profile = Profile::update(
        &state.db,
        auth.user_id,
        UpdateProfile {
            full_name: req.full_name.map(|n| n.trim().to_string()),
            bio: req.bio,
            avatar_url: req.avatar_url,
            university_id: req.university_id,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

pub async fn get_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PointsResponse>> {
    let points = Profile::points(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(PointsResponse { points }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PublicProfile>> {
    let profile = Profile::find_by_id(&state.db, id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile.public()))
}
