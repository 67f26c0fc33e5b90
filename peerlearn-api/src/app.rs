/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use peerlearn_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = peerlearn_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use peerlearn_shared::{
    auth::middleware::{authenticate, AuthContext, AuthError},
    models::profile::Profile,
    realtime::RealtimeHub,
    storage::{LocalObjectStore, ObjectStore},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Realtime fan-out for notifications and chat
    pub hub: RealtimeHub,

    /// Object bytes backend
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    /// Creates new application state with a local object store at
    /// `config.storage.root`
    pub fn new(db: PgPool, config: Config) -> Self {
        let storage = Arc::new(LocalObjectStore::new(config.storage.root.clone()));
        Self::with_storage(db, config, storage)
    }

    /// Creates state with an explicit object store
    pub fn with_storage(db: PgPool, config: Config, storage: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            hub: RealtimeHub::new(),
            storage,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/{register,login,refresh}   (public)
///     ├── GET /universities, GET /subjects[/:id]   (public)
///     ├── /profiles, /subjects, /sessions, /quizzes, /notes, /todos
///     ├── /chat, /notifications, /realtime/stream
///     ├── /applications, /wallet, /storage
///     └── /admin/*, /settings, /functions/send-reminders   (admin)
/// ```
///
/// Public and authenticated routes may share a path with different
/// methods; the JWT layer is attached to the authenticated router only.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (authenticated routes only)
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Catalogue reads (public)
    let public_routes = Router::new()
        .route("/universities", get(routes::universities::list_universities))
        .route("/subjects", get(routes::subjects::list_subjects))
        .route("/subjects/:id", get(routes::subjects::get_subject))
        .route("/subjects/:id/price", get(routes::subjects::get_price))
        .route("/teachers/:id/reviews", get(routes::reviews::list_teacher_reviews));

    // Everything else requires a valid access token
    let protected_routes = Router::new()
        // Profiles
        .route(
            "/profiles/me",
            get(routes::profiles::get_me).patch(routes::profiles::update_me),
        )
        .route("/profiles/me/points", get(routes::profiles::get_points))
        .route("/profiles/:id", get(routes::profiles::get_profile))
        // Universities
        .route("/universities", post(routes::universities::create_university))
        // Subjects
        .route("/subjects", post(routes::subjects::create_subject))
        .route("/subjects/mine", get(routes::subjects::list_my_subjects))
        .route(
            "/subjects/:id",
            patch(routes::subjects::update_subject).delete(routes::subjects::delete_subject),
        )
        .route("/subjects/:id/price", put(routes::subjects::set_price))
        // Subscriptions
        .route("/subjects/:id/subscribe", post(routes::subscriptions::subscribe))
        .route("/subscriptions", get(routes::subscriptions::list_my_subscriptions))
        // Posts
        .route(
            "/subjects/:id/posts",
            get(routes::posts::list_posts).post(routes::posts::create_post),
        )
        .route("/posts/:id", delete(routes::posts::delete_post))
        // Sessions
        .route(
            "/sessions",
            get(routes::sessions::list_sessions).post(routes::sessions::create_session),
        )
        .route(
            "/sessions/:id",
            get(routes::sessions::get_session).patch(routes::sessions::update_session),
        )
        .route("/sessions/:id/status", post(routes::sessions::change_status))
        .route("/sessions/:id/roster", get(routes::enrollments::roster))
        // Enrollments
        .route(
            "/sessions/:id/enroll",
            post(routes::enrollments::enroll).delete(routes::enrollments::unenroll),
        )
        .route("/enrollments", get(routes::enrollments::list_my_enrollments))
        // Reviews
        .route("/sessions/:id/reviews", post(routes::reviews::create_review))
        // Notes
        .route(
            "/notes",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/notes/:id",
            get(routes::notes::get_note)
                .patch(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        // Todos
        .route(
            "/todos",
            get(routes::todos::list_todos).post(routes::todos::create_todo),
        )
        .route(
            "/todos/:id",
            patch(routes::todos::update_todo).delete(routes::todos::delete_todo),
        )
        .route("/todos/:id/toggle", post(routes::todos::toggle_todo))
        // Quizzes
        .route(
            "/subjects/:id/quizzes",
            get(routes::quizzes::list_quizzes).post(routes::quizzes::create_quiz),
        )
        .route("/quizzes/:id", get(routes::quizzes::get_quiz))
        .route("/quizzes/:id/publish", post(routes::quizzes::publish_quiz))
        .route("/quizzes/:id/questions", post(routes::quizzes::add_question))
        .route(
            "/quizzes/:id/questions/:question_id",
            delete(routes::quizzes::delete_question),
        )
        .route(
            "/quizzes/:id/attempts",
            get(routes::quizzes::list_attempts).post(routes::quizzes::submit_attempt),
        )
        // Chat
        .route(
            "/chat/conversations",
            get(routes::chat::list_conversations).post(routes::chat::open_conversation),
        )
        .route(
            "/chat/conversations/:id/messages",
            get(routes::chat::list_messages).post(routes::chat::send_message),
        )
        .route("/chat/conversations/:id/read", post(routes::chat::mark_read))
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route("/notifications/read-all", post(routes::notifications::mark_all_read))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        // Realtime
        .route("/realtime/stream", get(routes::realtime::stream))
        // Teacher applications
        .route(
            "/applications",
            get(routes::applications::list_my_applications)
                .post(routes::applications::submit_application),
        )
        // Wallet
        .route("/wallet", get(routes::wallet::get_summary))
        .route("/wallet/earnings", get(routes::wallet::list_earnings))
        .route(
            "/wallet/withdrawals",
            get(routes::wallet::list_my_withdrawals).post(routes::wallet::request_withdrawal),
        )
        // Teacher analytics
        .route("/teachers/me/analytics", get(routes::admin::teacher_analytics))
        // Storage
        .route("/storage/:bucket", get(routes::storage::list_objects))
        .route(
            "/storage/:bucket/*path",
            put(routes::storage::upload)
                .get(routes::storage::download)
                .delete(routes::storage::delete_object),
        )
        // Settings (admin)
        .route("/settings", get(routes::settings::list_settings))
        .route("/settings/:key", put(routes::settings::update_setting))
        // Admin
        .route("/admin/add-teacher", post(routes::admin::add_teacher))
        .route("/admin/analytics", get(routes::admin::platform_analytics))
        .route("/admin/profiles/:id/active", put(routes::admin::set_profile_active))
        .route("/admin/subjects", get(routes::admin::list_subjects_for_review))
        .route("/admin/subjects/:id/review", post(routes::admin::review_subject))
        .route("/admin/applications", get(routes::applications::list_applications))
        .route(
            "/admin/applications/:id/review",
            post(routes::applications::review_application),
        )
        .route("/admin/withdrawals", get(routes::wallet::list_withdrawals))
        .route(
            "/admin/withdrawals/:id/status",
            post(routes::wallet::update_withdrawal_status),
        )
        // Functions
        .route(
            "/functions/send-reminders",
            post(routes::functions::send_reminders),
        )
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(public_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.cors_is_permissive() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the Bearer token from the Authorization header and injects
/// [`AuthContext`] into request extensions. Browsers cannot set headers on
/// an `EventSource`, so the token may also come as `?access_token=`.
///
/// The profile is looked up on every request, so a deactivation takes
/// effect immediately rather than when the access token expires.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = match authenticate(req.headers(), state.jwt_secret()) {
        Ok(ctx) => ctx,
        Err(AuthError::MissingCredentials) => {
            let token = query_token(req.uri().query())
                .ok_or(AuthError::MissingCredentials)?;
            let claims =
                peerlearn_shared::auth::jwt::validate_access_token(&token, state.jwt_secret())?;
            AuthContext::from_jwt(claims.sub, claims.roles)
        }
        Err(e) => return Err(e.into()),
    };

    match Profile::active_flag(&state.db, auth_context.user_id).await? {
        Some(true) => {}
        Some(false) => return Err(ApiError::Forbidden("Account is deactivated".to_string())),
        None => {
            return Err(ApiError::Unauthorized(
                "Account no longer exists".to_string(),
            ))
        }
    }

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Extracts `access_token` from a query string
fn query_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_token() {
        assert_eq!(
            query_token(Some("a=1&access_token=abc.def")),
            Some("abc.def".to_string())
        );
        assert_eq!(query_token(Some("access_token=")), None);
        assert_eq!(query_token(Some("token=abc")), None);
        assert_eq!(query_token(None), None);
    }
}
