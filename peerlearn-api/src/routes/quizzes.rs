/// Quiz endpoints
///
/// # Endpoints
///
/// - `GET /v1/subjects/:id/quizzes` - Published quizzes; the owner also
///   sees drafts
/// - `POST /v1/subjects/:id/quizzes` - Owner creates a draft
/// - `GET /v1/quizzes/:id` - Quiz with questions; correctness flags only for
///   the owner
/// - `POST /v1/quizzes/:id/publish` - Owner publishes or unpublishes
/// - `POST /v1/quizzes/:id/questions` - Owner adds a question
/// - `DELETE /v1/quizzes/:id/questions/:question_id`
/// - `GET /v1/quizzes/:id/attempts` - Own attempts; the owner sees everyone's
/// - `POST /v1/quizzes/:id/attempts` - Submit answers for grading
///
/// A student's first passing attempt earns `quiz_pass_points`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        non_blank,
        subjects::{load_owned_subject, load_subject},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    grading::{self, AnswerSubmission, SubmissionResult},
    models::{
        notification::{CreateNotification, NotificationKind},
        quiz::{
            validate_options, CreateQuiz, NewOption, QuestionWithOptions, Quiz, QuizAttempt,
            StudentQuestion,
        },
    },
    notify,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PASSING_SCORE: i32 = 60;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 3, max = 255, message = "Title must be 3-255 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 600, message = "Time limit must be 1-600 minutes"))]
    pub time_limit_minutes: Option<i32>,

    #[validate(range(min = 0, max = 100, message = "Passing score must be 0-100"))]
    pub passing_score: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default = "default_true")]
    pub published: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[validate(length(min = 1, max = 2000, message = "Prompt must be 1-2000 characters"))]
    pub prompt: String,

    pub options: Vec<NewOption>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AnswerSubmission>,

    #[validate(range(min = 0, message = "Time taken cannot be negative"))]
    pub time_taken_seconds: Option<i32>,
}

/// Questions with or without correctness flags, depending on the viewer
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuizQuestions {
    Full(Vec<QuestionWithOptions>),
    Student(Vec<StudentQuestion>),
}

#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: QuizQuestions,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Quiz not found".to_string())
}

async fn load_quiz(pool: &PgPool, id: Uuid) -> ApiResult<Quiz> {
    Quiz::find_by_id(pool, id).await?.ok_or_else(not_found)
}

/// Loads a quiz and requires the caller to have authored it
async fn load_owned_quiz(pool: &PgPool, id: Uuid, auth: &AuthContext) -> ApiResult<Quiz> {
    let quiz = load_quiz(pool, id).await?;
    if quiz.created_by != auth.user_id {
        return Err(ApiError::Forbidden(
            "Only the quiz author can do this".to_string(),
        ));
    }
    Ok(quiz)
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(subject_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Quiz>>> {
    let subject = load_subject(&state.db, subject_id).await?;
    let include_drafts = auth.owns_or_admin(subject.teacher_id);

    Ok(Json(
        Quiz::list_for_subject(&state.db, subject_id, include_drafts).await?,
    ))
}

pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(subject_id): Path<Uuid>,
    Json(req): Json<CreateQuizRequest>,
) -> ApiResult<(StatusCode, Json<Quiz>)> {
    req.validate()?;
    load_owned_subject(&state.db, subject_id, &auth).await?;

    let quiz = Quiz::create(
        &state.db,
        CreateQuiz {
            subject_id,
            created_by: auth.user_id,
            title: req.title.trim().to_string(),
            description: non_blank(req.description),
            time_limit_minutes: req.time_limit_minutes,
            passing_score: req.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
        },
    )
    .await?;

    info!(quiz_id = %quiz.id, subject_id = %subject_id, "Quiz created");
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuizDetail>> {
    let quiz = load_quiz(&state.db, id).await?;
    let is_author = auth.owns_or_admin(quiz.created_by);
    if !quiz.is_published && !is_author {
        return Err(not_found());
    }

    let loaded = Quiz::load_questions(&state.db, id).await?;
    let questions = if is_author {
        QuizQuestions::Full(loaded)
    } else {
        QuizQuestions::Student(loaded.into_iter().map(StudentQuestion::from).collect())
    };

    Ok(Json(QuizDetail { quiz, questions }))
}

pub async fn publish_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishRequest>,
) -> ApiResult<Json<Quiz>> {
    load_owned_quiz(&state.db, id, &auth).await?;

    if req.published && Quiz::question_count(&state.db, id).await? == 0 {
        return Err(ApiError::BadRequest(
            "Add at least one question before publishing".to_string(),
        ));
    }

    let quiz = Quiz::set_published(&state.db, id, req.published)
        .await?
        .ok_or_else(not_found)?;

    info!(quiz_id = %id, published = quiz.is_published, "Quiz visibility changed");
    Ok(Json(quiz))
}

pub async fn add_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddQuestionRequest>,
) -> ApiResult<(StatusCode, Json<QuestionWithOptions>)> {
    req.validate()?;
    validate_options(&req.options)?;
    load_owned_quiz(&state.db, id, &auth).await?;

    let question = Quiz::add_question(&state.db, id, req.prompt.trim(), &req.options).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    load_owned_quiz(&state.db, id, &auth).await?;

    if !Quiz::delete_question(&state.db, id, question_id).await? {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<QuizAttempt>>> {
    let quiz = load_quiz(&state.db, id).await?;

    let attempts = if auth.owns_or_admin(quiz.created_by) {
        QuizAttempt::list_for_quiz(&state.db, id).await?
    } else {
        QuizAttempt::list_for_student(&state.db, id, auth.user_id).await?
    };

    Ok(Json(attempts))
}

/// Submit answers
///
/// # Errors
///
/// - `400 Bad Request`: Draft quiz, no questions, foreign question or option
///   ids, or a question answered twice
/// - `404 Not Found`: Unknown quiz
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitAttemptRequest>,
) -> ApiResult<(StatusCode, Json<SubmissionResult>)> {
    req.validate()?;

    let result = grading::submit_attempt(
        &state.db,
        id,
        auth.user_id,
        &req.answers,
        req.time_taken_seconds,
    )
    .await?;

    if result.first_pass {
        notify::notify_logged(
            &state.db,
            &state.hub,
            CreateNotification::new(
                auth.user_id,
                NotificationKind::QuizPassed,
                format!("Quiz passed with {}%", result.attempt.score),
            )
            .with_body(format!(
                "You earned {} points",
                result.attempt.points_awarded
            ))
            .with_link(format!("/quizzes/{}", id)),
        )
        .await;
    }

    Ok((StatusCode::CREATED, Json(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_defaults_to_true() {
        let req: PublishRequest = serde_json::from_str("{}").unwrap();
        assert!(req.published);
        let req: PublishRequest = serde_json::from_str(r#"{"published": false}"#).unwrap();
        assert!(!req.published);
    }

    #[test]
    fn test_create_quiz_passing_score_bounds() {
        let mut req = CreateQuizRequest {
            title: "Derivatives".to_string(),
            description: None,
            time_limit_minutes: Some(20),
            passing_score: Some(101),
        };
        assert!(req.validate().is_err());
        req.passing_score = None;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_submit_request_tolerates_missing_option_ids() {
        let req: SubmitAttemptRequest = serde_json::from_str(&format!(
            r#"{{"answers": [{{"question_id": "{}"}}]}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert!(req.answers[0].option_ids.is_empty());
        assert!(req.validate().is_ok());
    }
}
