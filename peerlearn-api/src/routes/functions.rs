/// Maintenance functions callable over HTTP
///
/// - `POST /v1/functions/send-reminders` - Admin runs one reminder pass;
///   optional `{ "batch_size": n }`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use peerlearn_shared::{
    auth::{authorization::require_current_role, middleware::AuthContext},
    models::role::AppRole,
    reminders::{self, DEFAULT_BATCH_SIZE},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Largest batch one call may claim
pub const MAX_BATCH_SIZE: i64 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct SendRemindersRequest {
    pub batch_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SendRemindersResponse {
    pub sent: usize,
}

pub async fn send_reminders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<SendRemindersRequest>>,
) -> ApiResult<Json<SendRemindersResponse>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;

    let batch_size = body
        .and_then(|Json(req)| req.batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
        return Err(ApiError::invalid_field(
            "batch_size",
            format!("Batch size must be 1-{}", MAX_BATCH_SIZE),
        ));
    }

    let sent = reminders::dispatch_due_reminders(&state.db, &state.hub, batch_size).await?;

    info!(sent, batch_size, admin = %auth.user_id, "Reminder pass triggered over HTTP");
    Ok(Json(SendRemindersResponse { sent }))
}
