/// Subject post endpoints
///
/// - `GET /v1/subjects/:id/posts` - Owner, admins and active subscribers
/// - `POST /v1/subjects/:id/posts` - Owner; notifies active subscribers
/// - `DELETE /v1/posts/:id` - Author soft delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        non_blank,
        subjects::{load_owned_subject, load_subject},
        Pagination,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::{
        notification::{CreateNotification, NotificationKind},
        subject_post::{CreateSubjectPost, SubjectPost},
        subscription::Subscription,
    },
    notify,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 20000, message = "Body must be 1-20000 characters"))]
    pub body: String,

    pub attachment_url: Option<String>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(subject_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<SubjectPost>>> {
    let subject = load_subject(&state.db, subject_id).await?;

    if !auth.owns_or_admin(subject.teacher_id)
        && !Subscription::is_active_subscriber(&state.db, subject_id, auth.user_id).await?
    {
        return Err(ApiError::Forbidden(
            "Subscribe to this subject to read its posts".to_string(),
        ));
    }

    Ok(Json(
        SubjectPost::list_for_subject(&state.db, subject_id, page.limit(), page.offset()).await?,
    ))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(subject_id): Path<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<SubjectPost>)> {
    req.validate()?;
    let subject = load_owned_subject(&state.db, subject_id, &auth).await?;

    let post = SubjectPost::create(
        &state.db,
        CreateSubjectPost {
            subject_id,
            author_id: auth.user_id,
            title: req.title.trim().to_string(),
            body: req.body,
            attachment_url: non_blank(req.attachment_url),
        },
    )
    .await?;

    let subscribers = Subscription::active_subscriber_ids(&state.db, subject_id).await?;
    let template = CreateNotification::new(
        auth.user_id,
        NotificationKind::SubjectPost,
        format!("New post in {}", subject.title),
    )
    .with_body(post.title.clone())
    .with_link(format!("/subjects/{}/posts", subject_id));
    let notified = notify::notify_many(&state.db, &state.hub, subscribers, template).await;

    info!(post_id = %post.id, subject_id = %subject_id, notified, "Subject post created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !SubjectPost::soft_delete(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
