/// Review endpoints
///
/// - `POST /v1/sessions/:id/reviews` - Enrolled student rates a completed
///   session, once
/// - `GET /v1/teachers/:id/reviews` - Public; reviews plus rating summary

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, sessions::load_session, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::{
        enrollment::Enrollment,
        review::{CreateReview, RatingSummary, Review, ReviewView},
        session::SessionStatus,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be 1-5"))]
    pub rating: i16,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeacherReviews {
    pub summary: RatingSummary,
    pub reviews: Vec<ReviewView>,
}

/// Review a session
///
/// # Errors
///
/// - `400 Bad Request`: Session not completed yet
/// - `403 Forbidden`: Caller was not enrolled
/// - `409 Conflict`: Already reviewed
pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    req.validate()?;

    let session = load_session(&state.db, session_id).await?;
    if session.status != SessionStatus::Completed {
        return Err(ApiError::BadRequest(
            "Only completed sessions can be reviewed".to_string(),
        ));
    }
    if !Enrollment::exists(&state.db, session_id, auth.user_id).await? {
        return Err(ApiError::Forbidden(
            "Only enrolled students can review this session".to_string(),
        ));
    }

    let review = Review::create(
        &state.db,
        CreateReview {
            session_id,
            student_id: auth.user_id,
            teacher_id: session.teacher_id,
            rating: req.rating,
            comment: non_blank(req.comment),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_teacher_reviews(
    State(state): State<AppState>,
    Path(teacher_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<TeacherReviews>> {
    let summary = Review::summary_for_teacher(&state.db, teacher_id).await?;
    let reviews =
        Review::list_for_teacher(&state.db, teacher_id, page.limit(), page.offset()).await?;

    Ok(Json(TeacherReviews { summary, reviews }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        let ok = CreateReviewRequest {
            rating: 5,
            comment: None,
        };
        assert!(ok.validate().is_ok());

        for rating in [0, 6, -1] {
            let bad = CreateReviewRequest {
                rating,
                comment: None,
            };
            assert!(bad.validate().is_err(), "rating {} accepted", rating);
        }
    }
}
