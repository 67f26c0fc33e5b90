/// Live session endpoints
///
/// # Endpoints
///
/// - `GET /v1/sessions` - Upcoming and live sessions; filters `subject_id`,
///   `teacher_id`
/// - `POST /v1/sessions` - Teacher schedules a session on an approved
///   subject they own
/// - `GET /v1/sessions/:id`
/// - `PATCH /v1/sessions/:id` - Owner edits a session that has not started
/// - `POST /v1/sessions/:id/status` - Owner moves the session along
///   `scheduled → live → completed`, or cancels it
///
/// Cancelling drops pending reminders and notifies every enrolled student.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, non_blank, subjects::load_owned_subject, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use peerlearn_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        enrollment::Enrollment,
        notification::{CreateNotification, NotificationKind},
        reminder::Reminder,
        role::AppRole,
        session::{
            validate_schedule, CreateSession, SessionListing, SessionStatus, TutoringSession,
            UpdateSession,
        },
        subject::SubjectStatus,
    },
    notify, scheduling,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub subject_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SessionQuery {
    pub fn page(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub subject_id: Uuid,

    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub scheduled_at: DateTime<Utc>,

    pub duration_minutes: i32,

    pub max_students: i32,

    pub meeting_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSessionRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub scheduled_at: Option<DateTime<Utc>>,

    pub duration_minutes: Option<i32>,

    pub max_students: Option<i32>,

    #[serde(default, deserialize_with = "double_option")]
    pub meeting_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: TutoringSession,
    pub enrolled_count: i64,
    pub is_enrolled: bool,
}

pub(crate) async fn load_session(pool: &PgPool, id: Uuid) -> ApiResult<TutoringSession> {
    TutoringSession::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<Vec<SessionListing>>> {
    let page = query.page();
    let sessions = TutoringSession::list_upcoming(
        &state.db,
        query.subject_id,
        query.teacher_id,
        page.limit(),
        page.offset(),
    )
    .await?;

    Ok(Json(sessions))
}

pub async fn create_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<TutoringSession>)> {
    require_role(&auth, AppRole::Teacher)?;
    req.validate()?;
    validate_schedule(
        Utc::now(),
        Some(req.scheduled_at),
        Some(req.duration_minutes),
        Some(req.max_students),
    )?;

    let subject = load_owned_subject(&state.db, req.subject_id, &auth).await?;
    if subject.status != SubjectStatus::Approved || !subject.is_active {
        return Err(ApiError::BadRequest(
            "Sessions can only be scheduled on approved, active subjects".to_string(),
        ));
    }

    let session = TutoringSession::create(
        &state.db,
        CreateSession {
            subject_id: subject.id,
            teacher_id: auth.user_id,
            title: req.title.trim().to_string(),
            description: non_blank(req.description),
            scheduled_at: req.scheduled_at,
            duration_minutes: req.duration_minutes,
            max_students: req.max_students,
            meeting_url: non_blank(req.meeting_url),
        },
    )
    .await?;

    info!(
        session_id = %session.id,
        subject_id = %subject.id,
        scheduled_at = %session.scheduled_at,
        "Session scheduled"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    let session = load_session(&state.db, id).await?;
    let enrolled_count = Enrollment::count_for_session(&state.db, id).await?;
    let is_enrolled = Enrollment::exists(&state.db, id, auth.user_id).await?;

    Ok(Json(SessionDetail {
        session,
        enrolled_count,
        is_enrolled,
    }))
}

pub async fn update_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSessionRequest>,
) -> ApiResult<Json<TutoringSession>> {
    req.validate()?;
    validate_schedule(
        Utc::now(),
        req.scheduled_at,
        req.duration_minutes,
        req.max_students,
    )?;

    let updated = scheduling::update_session(
        &state.db,
        id,
        auth.user_id,
        UpdateSession {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            scheduled_at: req.scheduled_at,
            duration_minutes: req.duration_minutes,
            max_students: req.max_students,
            meeting_url: req.meeting_url,
        },
    )
    .await?;

    Ok(Json(updated))
}

pub async fn change_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<TutoringSession>> {
    let session = load_session(&state.db, id).await?;
    if !auth.owns_or_admin(session.teacher_id) {
        return Err(ApiError::Forbidden(
            "Only the session's teacher can change its status".to_string(),
        ));
    }

    if !session.status.can_transition_to(req.status) {
        return Err(ApiError::Conflict(format!(
            "Cannot move a {} session to {}",
            session.status.as_str(),
            req.status.as_str()
        )));
    }

    let updated = TutoringSession::transition(&state.db, id, session.status, req.status)
        .await?
        .ok_or_else(|| ApiError::Conflict("Session status changed concurrently".to_string()))?;

    info!(
        session_id = %id,
        from = session.status.as_str(),
        to = updated.status.as_str(),
        "Session status changed"
    );

    if updated.status == SessionStatus::Cancelled {
        let dropped = Reminder::delete_all_unsent_for_session(&state.db, id).await?;
        let students = Enrollment::student_ids(&state.db, id).await?;
        let template = CreateNotification::new(
            auth.user_id,
            NotificationKind::SessionCancelled,
            format!("Session cancelled: {}", updated.title),
        )
        .with_link(format!("/sessions/{}", id));
        let notified = notify::notify_many(&state.db, &state.hub, students, template).await;

        info!(session_id = %id, notified, reminders_dropped = dropped, "Session cancelled");
    }

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request_parses_lowercase() {
        let req: StatusRequest = serde_json::from_str(r#"{"status": "cancelled"}"#).unwrap();
        assert_eq!(req.status, SessionStatus::Cancelled);
        assert!(serde_json::from_str::<StatusRequest>(r#"{"status": "paused"}"#).is_err());
    }

    #[test]
    fn test_session_query_defaults() {
        let query = SessionQuery::default();
        assert_eq!(query.page().limit(), Pagination::DEFAULT_LIMIT);
        assert!(query.subject_id.is_none());
    }
}
