/// Teacher application endpoints
///
/// - `POST /v1/applications` - Apply for teaching rights (one pending at a
///   time)
/// - `GET /v1/applications` - Caller's applications
/// - `GET /v1/admin/applications` - Admin list, filter `status`
/// - `POST /v1/admin/applications/:id/review` - Admin approves (grants the
///   `teacher` role) or rejects; the applicant is notified either way

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::{authorization::require_current_role, middleware::AuthContext},
    models::{
        notification::{CreateNotification, NotificationKind},
        role::{AppRole, UserRole},
        teacher_application::{ApplicationStatus, CreateApplication, TeacherApplication},
    },
    notify,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitApplicationRequest {
    #[validate(length(min = 20, max = 5000, message = "Bio must be 20-5000 characters"))]
    pub bio: String,

    #[validate(length(
        min = 10,
        max = 5000,
        message = "Qualifications must be 10-5000 characters"
    ))]
    pub qualifications: String,

    #[validate(length(min = 1, max = 20, message = "List 1-20 subjects"))]
    pub subjects: Vec<String>,

    pub document_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewApplicationRequest {
    pub decision: ApplicationStatus,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

pub async fn submit_application(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SubmitApplicationRequest>,
) -> ApiResult<(StatusCode, Json<TeacherApplication>)> {
    req.validate()?;

    if auth.has_role(AppRole::Teacher) {
        return Err(ApiError::Conflict("You are already a teacher".to_string()));
    }

    let subjects: Vec<String> = req
        .subjects
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if subjects.is_empty() {
        return Err(ApiError::invalid_field("subjects", "List at least one subject"));
    }

    let application = TeacherApplication::create(
        &state.db,
        CreateApplication {
            user_id: auth.user_id,
            bio: req.bio.trim().to_string(),
            qualifications: req.qualifications.trim().to_string(),
            subjects,
            document_url: non_blank(req.document_url),
        },
    )
    .await?;

    info!(application_id = %application.id, user_id = %auth.user_id, "Teacher application submitted");
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_my_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TeacherApplication>>> {
    Ok(Json(
        TeacherApplication::list_for_user(&state.db, auth.user_id).await?,
    ))
}

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ApplicationQuery>,
) -> ApiResult<Json<Vec<TeacherApplication>>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    Ok(Json(
        TeacherApplication::list(&state.db, query.status, page.limit(), page.offset()).await?,
    ))
}

/// Decide on a pending application
///
/// # Errors
///
/// - `400 Bad Request`: Decision is `pending`
/// - `404 Not Found`: Unknown application
/// - `409 Conflict`: Already reviewed
pub async fn review_application(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewApplicationRequest>,
) -> ApiResult<Json<TeacherApplication>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    req.validate()?;

    if req.decision == ApplicationStatus::Pending {
        return Err(ApiError::invalid_field(
            "decision",
            "Decision must be approved or rejected",
        ));
    }

    let existing = TeacherApplication::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;
    if existing.status != ApplicationStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Application was already {}",
            existing.status.as_str()
        )));
    }

    let mut tx = state.db.begin().await?;
    let reviewed = TeacherApplication::review(
        &mut *tx,
        id,
        auth.user_id,
        req.decision,
        non_blank(req.notes),
    )
    .await?
    .ok_or_else(|| ApiError::Conflict("Application was already reviewed".to_string()))?;

    if reviewed.status == ApplicationStatus::Approved {
        UserRole::grant(&mut *tx, reviewed.user_id, AppRole::Teacher).await?;
    }
    tx.commit().await?;

    info!(
        application_id = %id,
        user_id = %reviewed.user_id,
        decision = reviewed.status.as_str(),
        reviewer = %auth.user_id,
        "Teacher application reviewed"
    );

    let title = match reviewed.status {
        ApplicationStatus::Approved => "Your teacher application was approved",
        _ => "Your teacher application was not approved",
    };
    let mut notification =
        CreateNotification::new(reviewed.user_id, NotificationKind::ApplicationReviewed, title)
            .with_link("/applications");
    if let Some(notes) = &reviewed.review_notes {
        notification = notification.with_body(notes.clone());
    }
    notify::notify_logged(&state.db, &state.hub, notification).await;

    Ok(Json(reviewed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_request_parses_decision() {
        let req: ReviewApplicationRequest =
            serde_json::from_str(r#"{"decision": "rejected", "notes": "Missing transcript"}"#)
                .unwrap();
        assert_eq!(req.decision, ApplicationStatus::Rejected);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_submit_requires_subjects() {
        let req = SubmitApplicationRequest {
            bio: "I have tutored calculus for three years.".to_string(),
            qualifications: "BSc Mathematics".to_string(),
            subjects: vec![],
            document_url: None,
        };
        assert!(req.validate().is_err());
    }
}
