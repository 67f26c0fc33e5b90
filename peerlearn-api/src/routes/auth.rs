/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create an account (role `student`)
/// - `POST /v1/auth/login` - Exchange email and password for tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
///
/// New accounts receive `signup_bonus_points` from the platform settings.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use peerlearn_shared::{
    auth::{jwt, password},
    models::{
        profile::{normalize_email, CreateProfile, Profile},
        role::{AppRole, UserRole},
        setting::{PlatformSetting, SettingKey},
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub full_name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Tokens plus who they belong to
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub roles: Vec<AppRole>,
    /// Access token (24h)
    pub access_token: String,
    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
    pub roles: Vec<AppRole>,
}

/// Register a new user
///
/// Creates the profile and its `student` role in one transaction.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "SecureP4ss",
///   "full_name": "Ada Lovelace"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;

    let bonus = PlatformSetting::get_i64(&mut *tx, SettingKey::SignupBonusPoints).await?;

    let profile = Profile::create(
        &mut *tx,
        CreateProfile {
            email: normalize_email(&req.email),
            password_hash,
            full_name: req.full_name.trim().to_string(),
            points: i32::try_from(bonus).unwrap_or(0),
        },
    )
    .await?;

    UserRole::grant(&mut *tx, profile.id, AppRole::Student).await?;

    tx.commit().await?;

    let roles = vec![AppRole::Student];
    let tokens = jwt::issue_token_pair(profile.id, roles.clone(), state.jwt_secret())?;

    info!(user_id = %profile.id, "Profile registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: profile.id.to_string(),
            roles,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account deactivated
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let profile = Profile::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &profile.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !profile.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    let roles = UserRole::roles_for(&state.db, profile.id).await?;
    Profile::update_last_login(&state.db, profile.id).await?;

    let tokens = jwt::issue_token_pair(profile.id, roles.clone(), state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user_id: profile.id.to_string(),
        roles,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Token refresh endpoint
///
/// The new access token carries the roles currently in `user_roles`, so a
/// role granted since login takes effect here.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let profile = Profile::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    if !profile.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    let roles = UserRole::roles_for(&state.db, profile.id).await?;
    let access = jwt::Claims::new(profile.id, roles.clone(), jwt::TokenType::Access);
    let access_token = jwt::create_token(&access, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        roles,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "ada@example.com".into(),
            password: "SecureP4ss".into(),
            full_name: "Ada".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            full_name: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("full_name"));
    }
}
