/// Enrollment endpoints
///
/// - `POST /v1/sessions/:id/enroll` - Enroll; schedules a reminder and
///   notifies the teacher
/// - `DELETE /v1/sessions/:id/enroll` - Unenroll; drops unsent reminders
/// - `GET /v1/enrollments` - Caller's enrollments
/// - `GET /v1/sessions/:id/roster` - Enrolled students (teacher or admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::sessions::load_session,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::{
        enrollment::{Enrollment, EnrollmentView, RosterEntry},
        notification::{CreateNotification, NotificationKind},
        profile::Profile,
    },
    notify,
    scheduling,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub enrollment: Enrollment,
    pub remind_at: DateTime<Utc>,
}

/// Enroll in a session
///
/// # Errors
///
/// - `400 Bad Request`: Own session, or session not open
/// - `404 Not Found`: Unknown session
/// - `409 Conflict`: Already enrolled, or session full
pub async fn enroll(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<EnrollResponse>)> {
    let outcome = scheduling::enroll(&state.db, session_id, auth.user_id).await?;

    let student_name = Profile::find_by_id(&state.db, auth.user_id)
        .await?
        .map(|p| p.full_name)
        .unwrap_or_else(|| "A student".to_string());

    notify::notify_logged(
        &state.db,
        &state.hub,
        CreateNotification::new(
            outcome.session.teacher_id,
            NotificationKind::Enrollment,
            format!("{} enrolled in {}", student_name, outcome.session.title),
        )
        .with_link(format!("/sessions/{}", session_id)),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            enrollment: outcome.enrollment,
            remind_at: outcome.reminder.remind_at,
        }),
    ))
}

pub async fn unenroll(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    scheduling::unenroll(&state.db, session_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_my_enrollments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<EnrollmentView>>> {
    Ok(Json(
        Enrollment::list_for_student(&state.db, auth.user_id).await?,
    ))
}

pub async fn roster(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RosterEntry>>> {
    let session = load_session(&state.db, session_id).await?;
    if !auth.owns_or_admin(session.teacher_id) {
        return Err(ApiError::Forbidden(
            "Only the session's teacher can see its roster".to_string(),
        ));
    }

    Ok(Json(Enrollment::roster(&state.db, session_id).await?))
}
