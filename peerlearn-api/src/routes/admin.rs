/// Administration and analytics endpoints
///
/// # Endpoints
///
/// - `POST /v1/admin/add-teacher` - Grant the `teacher` role by email
/// - `GET /v1/admin/analytics` - Platform totals
/// - `PUT /v1/admin/profiles/:id/active` - Deactivate or reactivate a user
/// - `GET /v1/admin/subjects` - Moderation queue, filter `status`
///   (default `pending`)
/// - `POST /v1/admin/subjects/:id/review` - Approve or reject a subject
/// - `GET /v1/teachers/me/analytics` - The calling teacher's own numbers
///
/// Everything here except teacher analytics requires the `admin` role.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use peerlearn_shared::{
    auth::{
        authorization::{require_current_role, require_role},
        middleware::AuthContext,
    },
    models::{
        earning::TeacherEarning,
        enrollment::Enrollment,
        notification::{CreateNotification, NotificationKind},
        profile::Profile,
        quiz::QuizAttempt,
        review::Review,
        role::{AppRole, UserRole},
        session::TutoringSession,
        subject::{Subject, SubjectStatus},
        subscription::Subscription,
        withdrawal::{WithdrawalRequest, WithdrawalStatus},
    },
    notify,
    wallet,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddTeacherRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AddTeacherResponse {
    pub user_id: Uuid,
    /// False when the user already was a teacher
    pub granted: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubjectQueueQuery {
    pub status: Option<SubjectStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewSubjectRequest {
    pub status: SubjectStatus,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EarningsTotals {
    pub gross: i64,
    pub commission: i64,
    pub net: i64,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalTotalsByStatus {
    pub pending: i64,
    pub approved: i64,
    pub paid: i64,
    pub rejected: i64,
}

#[derive(Debug, Serialize)]
pub struct PlatformAnalytics {
    pub total_users: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub subjects_by_status: BTreeMap<String, i64>,
    pub total_sessions: i64,
    pub total_enrollments: i64,
    pub total_quiz_attempts: i64,
    pub points_spent: i64,
    pub earnings: EarningsTotals,
    pub withdrawals: WithdrawalTotalsByStatus,
}

#[derive(Debug, Serialize)]
pub struct TeacherAnalytics {
    pub total_sessions: i64,
    pub distinct_students: i64,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub active_subscribers: i64,
    pub total_net_earnings: i64,
    pub available_balance: i64,
}

/// Counts keyed by name, with every expected key present
fn tally<K: Copy>(
    all: &[K],
    name: impl Fn(K) -> &'static str,
    counts: Vec<(K, i64)>,
) -> BTreeMap<String, i64> {
    let mut map: BTreeMap<String, i64> = all.iter().map(|k| (name(*k).to_string(), 0)).collect();
    for (key, count) in counts {
        *map.entry(name(key).to_string()).or_insert(0) += count;
    }
    map
}

/// Grant the teacher role to an existing user
///
/// Idempotent: granting twice reports `granted: false`.
pub async fn add_teacher(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddTeacherRequest>,
) -> ApiResult<Json<AddTeacherResponse>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    req.validate()?;

    let profile = Profile::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with that email".to_string()))?;

    let granted = UserRole::grant(&state.db, profile.id, AppRole::Teacher).await?;

    info!(user_id = %profile.id, granted, admin = %auth.user_id, "Teacher role granted");
    Ok(Json(AddTeacherResponse {
        user_id: profile.id,
        granted,
    }))
}

pub async fn platform_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PlatformAnalytics>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    let db = &state.db;

    let users_by_role = tally(
        &[AppRole::Student, AppRole::Teacher, AppRole::Admin],
        |r| r.as_str(),
        UserRole::count_by_role(db).await?,
    );
    let subjects_by_status = tally(
        &[
            SubjectStatus::Pending,
            SubjectStatus::Approved,
            SubjectStatus::Rejected,
        ],
        |s| s.as_str(),
        Subject::count_by_status(db).await?,
    );
    let (gross, commission, net) = TeacherEarning::platform_totals(db).await?;

    Ok(Json(PlatformAnalytics {
        total_users: Profile::count(db).await?,
        users_by_role,
        subjects_by_status,
        total_sessions: TutoringSession::count(db).await?,
        total_enrollments: Enrollment::count(db).await?,
        total_quiz_attempts: QuizAttempt::count(db).await?,
        points_spent: Subscription::total_points_spent(db).await?,
        earnings: EarningsTotals {
            gross,
            commission,
            net,
        },
        withdrawals: WithdrawalTotalsByStatus {
            pending: WithdrawalRequest::total_by_status(db, WithdrawalStatus::Pending).await?,
            approved: WithdrawalRequest::total_by_status(db, WithdrawalStatus::Approved).await?,
            paid: WithdrawalRequest::total_by_status(db, WithdrawalStatus::Paid).await?,
            rejected: WithdrawalRequest::total_by_status(db, WithdrawalStatus::Rejected).await?,
        },
    }))
}

pub async fn teacher_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TeacherAnalytics>> {
    require_role(&auth, AppRole::Teacher)?;
    let db = &state.db;
    let teacher_id = auth.user_id;

    let rating = Review::summary_for_teacher(db, teacher_id).await?;
    let balance = wallet::summary(db, teacher_id).await?;

    Ok(Json(TeacherAnalytics {
        total_sessions: TutoringSession::count_for_teacher(db, teacher_id).await?,
        distinct_students: Enrollment::count_distinct_students_for_teacher(db, teacher_id).await?,
        average_rating: rating.average_rating,
        review_count: rating.review_count,
        active_subscribers: Subscription::count_active_for_teacher(db, teacher_id).await?,
        total_net_earnings: balance.total_earned,
        available_balance: balance.available,
    }))
}

pub async fn set_profile_active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<Json<SetActiveRequest>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;

    if id == auth.user_id && !req.is_active {
        return Err(ApiError::BadRequest(
            "Admins cannot deactivate themselves".to_string(),
        ));
    }

    if !Profile::set_active(&state.db, id, req.is_active).await? {
        return Err(ApiError::NotFound("Profile not found".to_string()));
    }

    info!(profile_id = %id, is_active = req.is_active, admin = %auth.user_id, "Profile activity changed");
    Ok(Json(req))
}

pub async fn list_subjects_for_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SubjectQueueQuery>,
) -> ApiResult<Json<Vec<Subject>>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    Ok(Json(
        Subject::list_by_status(
            &state.db,
            query.status.unwrap_or(SubjectStatus::Pending),
            page.limit(),
            page.offset(),
        )
        .await?,
    ))
}

pub async fn review_subject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewSubjectRequest>,
) -> ApiResult<Json<Subject>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    req.validate()?;

    if req.status == SubjectStatus::Pending {
        return Err(ApiError::invalid_field(
            "status",
            "Status must be approved or rejected",
        ));
    }

    let subject = Subject::set_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

    info!(subject_id = %id, status = subject.status.as_str(), admin = %auth.user_id, "Subject reviewed");

    let mut notification = CreateNotification::new(
        subject.teacher_id,
        NotificationKind::SubjectReviewed,
        format!("{} was {}", subject.title, subject.status.as_str()),
    )
    .with_link(format!("/subjects/{}", subject.id));
    if let Some(notes) = non_blank(req.notes) {
        notification = notification.with_body(notes);
    }
    notify::notify_logged(&state.db, &state.hub, notification).await;

    Ok(Json(subject))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_includes_missing_keys() {
        let map = tally(
            &[AppRole::Student, AppRole::Teacher, AppRole::Admin],
            |r| r.as_str(),
            vec![(AppRole::Student, 12), (AppRole::Admin, 1)],
        );
        assert_eq!(map.get("student"), Some(&12));
        assert_eq!(map.get("teacher"), Some(&0));
        assert_eq!(map.get("admin"), Some(&1));
    }

    #[test]
    fn test_add_teacher_requires_email() {
        let req = AddTeacherRequest {
            email: "not-an-email".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
