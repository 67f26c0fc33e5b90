/// Middleware modules for the API server
///
/// - Security headers
///
/// JWT authentication lives in `app.rs` because it needs `AppState`.

pub mod security;
