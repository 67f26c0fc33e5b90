/// Subject endpoints
///
/// # Endpoints
///
/// - `GET /v1/subjects` - Public catalogue (approved, active, not deleted);
///   filters `university_id`, `teacher_id`, `q`, plus `limit`/`offset`
/// - `GET /v1/subjects/:id` - One public subject with its price
/// - `GET /v1/subjects/:id/price` - Price only
/// - `POST /v1/subjects` - Teacher creates a subject (status `pending`)
/// - `GET /v1/subjects/mine` - Teacher's own subjects, any status
/// - `PATCH /v1/subjects/:id` - Owner update; a rejected subject goes back
///   to `pending`
/// - `DELETE /v1/subjects/:id` - Owner or admin soft delete
/// - `PUT /v1/subjects/:id/price` - Owner sets price and period
///
/// Moderation lives under `/v1/admin/subjects`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, non_blank},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        role::AppRole,
        subject::{CreateSubject, Subject, SubjectFilter, UpdateSubject},
        subject_price::SubjectPrice,
        university::University,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Longest subscription period a price may grant
pub const MAX_DURATION_DAYS: i32 = 3650;

#[derive(Debug, Serialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub price: Option<SubjectPrice>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub cover_url: Option<String>,

    pub university_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub cover_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub university_id: Option<Option<Uuid>>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPriceRequest {
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_points: i32,

    #[validate(range(min = 1, max = 3650, message = "Duration must be 1-3650 days"))]
    pub duration_days: i32,
}

/// Loads a non-deleted subject or 404s
pub(crate) async fn load_subject(pool: &PgPool, id: Uuid) -> ApiResult<Subject> {
    Subject::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
}

/// Loads a subject and requires the caller to own it
pub(crate) async fn load_owned_subject(
    pool: &PgPool,
    id: Uuid,
    auth: &AuthContext,
) -> ApiResult<Subject> {
    let subject = load_subject(pool, id).await?;
    if subject.teacher_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "Only the subject's teacher can do this".to_string(),
        ));
    }
    Ok(subject)
}

async fn check_university(pool: &PgPool, university_id: Option<Uuid>) -> ApiResult<()> {
    if let Some(id) = university_id {
        if !University::exists(pool, id).await? {
            return Err(ApiError::invalid_field("university_id", "Unknown university"));
        }
    }
    Ok(())
}

pub async fn list_subjects(
    State(state): State<AppState>,
    Query(filter): Query<SubjectFilter>,
) -> ApiResult<Json<Vec<Subject>>> {
    Ok(Json(Subject::list_public(&state.db, &filter).await?))
}

pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SubjectDetail>> {
    let subject = load_subject(&state.db, id).await?;
    if !subject.is_public() {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }
    let price = SubjectPrice::find(&state.db, id).await?;

    Ok(Json(SubjectDetail { subject, price }))
}

pub async fn get_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SubjectPrice>> {
    SubjectPrice::find(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Subject has no price".to_string()))
}

pub async fn create_subject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSubjectRequest>,
) -> ApiResult<(StatusCode, Json<Subject>)> {
    require_role(&auth, AppRole::Teacher)?;
    req.validate()?;
    check_university(&state.db, req.university_id).await?;

    let subject = Subject::create(
        &state.db,
        CreateSubject {
            teacher_id: auth.user_id,
            university_id: req.university_id,
            title: req.title.trim().to_string(),
            description: non_blank(req.description),
            cover_url: non_blank(req.cover_url),
        },
    )
    .await?;

    info!(subject_id = %subject.id, teacher_id = %auth.user_id, "Subject submitted for review");
    Ok((StatusCode::CREATED, Json(subject)))
}

pub async fn list_my_subjects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Subject>>> {
    require_role(&auth, AppRole::Teacher)?;
    Ok(Json(Subject::list_by_teacher(&state.db, auth.user_id).await?))
}

pub async fn update_subject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSubjectRequest>,
) -> ApiResult<Json<Subject>> {
    req.validate()?;
    let subject = load_owned_subject(&state.db, id, &auth).await?;

    if let Some(university_id) = req.university_id {
        check_university(&state.db, university_id).await?;
    }

    let updated = Subject::update(
        &state.db,
        id,
        subject.teacher_id,
        UpdateSubject {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            cover_url: req.cover_url,
            university_id: req.university_id,
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    Ok(Json(updated))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let subject = load_subject(&state.db, id).await?;
    if !auth.owns_or_admin(subject.teacher_id) {
        return Err(ApiError::Forbidden(
            "Only the subject's teacher can delete it".to_string(),
        ));
    }

    if !Subject::soft_delete(&state.db, id, subject.teacher_id).await? {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    info!(subject_id = %id, deleted_by = %auth.user_id, "Subject deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_price(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetPriceRequest>,
) -> ApiResult<Json<SubjectPrice>> {
    req.validate()?;
    load_owned_subject(&state.db, id, &auth).await?;

    let price = SubjectPrice::upsert(&state.db, id, req.price_points, req.duration_days).await?;

    info!(
        subject_id = %id,
        price_points = price.price_points,
        duration_days = price.duration_days,
        "Subject price set"
    );
    Ok(Json(price))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_price_validation() {
        assert!(SetPriceRequest {
            price_points: 0,
            duration_days: 30
        }
        .validate()
        .is_ok());
        assert!(SetPriceRequest {
            price_points: -1,
            duration_days: 30
        }
        .validate()
        .is_err());
        assert!(SetPriceRequest {
            price_points: 10,
            duration_days: MAX_DURATION_DAYS + 1
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_update_request_distinguishes_null() {
        let req: UpdateSubjectRequest =
            serde_json::from_str(r#"{"description": null, "title": "Algebra"}"#).unwrap();
        assert_eq!(req.description, Some(None));
        assert_eq!(req.cover_url, None);
        assert!(req.validate().is_ok());
    }
}
