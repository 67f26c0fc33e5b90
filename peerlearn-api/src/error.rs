/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>` which automatically
/// converts to appropriate HTTP status codes.
///
/// Every error body has the same shape:
///
/// ```json
/// { "error": "conflict", "message": "Already enrolled in this session" }
/// ```
///
/// with an extra `details` array for validation failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use peerlearn_shared::{
    auth::{
        authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
    },
    billing::SubscriptionError,
    grading::GradingError,
    models::{quiz::QuestionError, session::ScheduleError, setting::SettingError},
    scheduling::{EnrollmentError, SessionEditError},
    storage::StorageError,
    wallet::WalletError,
};
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Conflict (409) with the `insufficient_points` code
    InsufficientPoints(String),

    /// Payload too large (413)
    PayloadTooLarge(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InsufficientPoints(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable code written to the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::InsufficientPoints(_) => "insufficient_points",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InsufficientPoints(msg) => write!(f, "Insufficient points: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InsufficientPoints(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Friendly conflict messages for the unique constraints clients can hit
fn conflict_message(constraint: &str) -> Option<&'static str> {
    Some(match constraint {
        "profiles_email_key" => "Email already exists",
        "enrollments_session_student_key" => "Already enrolled in this session",
        "reviews_session_student_key" => "You have already reviewed this session",
        "subject_subscriptions_subject_student_key" => "Already subscribed to this subject",
        "teacher_applications_one_pending_key" => "You already have a pending application",
        "universities_name_key" => "University already exists",
        "storage_objects_bucket_path_key" => "Object already exists",
        _ => return None,
    })
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or_default().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => ApiError::Conflict(
                        conflict_message(&constraint)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("Constraint violation: {}", constraint)),
                    ),
                    ErrorKind::ForeignKeyViolation => ApiError::BadRequest(format!(
                        "Referenced resource does not exist ({})",
                        constraint
                    )),
                    ErrorKind::CheckViolation => {
                        ApiError::BadRequest(format!("Value out of range ({})", constraint))
                    }
                    // Other database errors are internal
                    _ => ApiError::InternalError(format!("Database error: {}", db_err)),
                }
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert validator failures to 422 with per-field details
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingRole(role) => {
                ApiError::Forbidden(format!("Requires the {} role", role))
            }
            AuthzError::NotOwner => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
            AuthzError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownBucket(_) => ApiError::NotFound(err.to_string()),
            StorageError::InvalidPath(_) => ApiError::BadRequest(err.to_string()),
            StorageError::NotFound => ApiError::NotFound("Object not found".to_string()),
            StorageError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            StorageError::Forbidden => ApiError::Forbidden(err.to_string()),
            StorageError::Io(e) => ApiError::InternalError(format!("Storage I/O error: {}", e)),
            StorageError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<GradingError> for ApiError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::QuizNotFound => ApiError::NotFound(err.to_string()),
            GradingError::NotPublished
            | GradingError::NoQuestions
            | GradingError::UnknownQuestion(_)
            | GradingError::UnknownOption { .. }
            | GradingError::DuplicateAnswer(_) => ApiError::BadRequest(err.to_string()),
            GradingError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NonPositiveAmount | WalletError::BelowMinimum { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            WalletError::InsufficientBalance { .. } => ApiError::Conflict(err.to_string()),
            WalletError::ProfileNotFound => ApiError::NotFound(err.to_string()),
            WalletError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::SubjectNotFound | SubscriptionError::ProfileNotFound => {
                ApiError::NotFound(err.to_string())
            }
            SubscriptionError::SubjectUnavailable
            | SubscriptionError::NoPrice
            | SubscriptionError::OwnSubject => ApiError::BadRequest(err.to_string()),
            SubscriptionError::InsufficientPoints { .. } => {
                ApiError::InsufficientPoints(err.to_string())
            }
            SubscriptionError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::SessionNotFound | EnrollmentError::NotEnrolled => {
                ApiError::NotFound(err.to_string())
            }
            EnrollmentError::NotScheduled | EnrollmentError::OwnSession => {
                ApiError::BadRequest(err.to_string())
            }
            EnrollmentError::SessionFull | EnrollmentError::AlreadyEnrolled => {
                ApiError::Conflict(err.to_string())
            }
            EnrollmentError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<SessionEditError> for ApiError {
    fn from(err: SessionEditError) -> Self {
        match err {
            SessionEditError::SessionNotFound => ApiError::NotFound(err.to_string()),
            SessionEditError::NotOwner => ApiError::Forbidden(err.to_string()),
            SessionEditError::NotEditable | SessionEditError::BelowEnrolled { .. } => {
                ApiError::Conflict(err.to_string())
            }
            SessionEditError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        let field = match err {
            ScheduleError::NotInFuture => "scheduled_at",
            ScheduleError::InvalidDuration => "duration_minutes",
            ScheduleError::InvalidCapacity => "max_students",
        };
        ApiError::invalid_field(field, err.to_string())
    }
}

impl From<QuestionError> for ApiError {
    fn from(err: QuestionError) -> Self {
        ApiError::invalid_field("options", err.to_string())
    }
}

impl From<SettingError> for ApiError {
    fn from(err: SettingError) -> Self {
        match err {
            SettingError::UnknownKey(_) => ApiError::NotFound(err.to_string()),
            SettingError::NotAnInteger(_) | SettingError::OutOfRange { .. } => {
                ApiError::invalid_field("value", err.to_string())
            }
        }
    }
}
