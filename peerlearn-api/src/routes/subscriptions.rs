/// Subscription endpoints
///
/// - `POST /v1/subjects/:id/subscribe` - Pay one period with points
/// - `GET /v1/subscriptions` - Caller's subscriptions with `is_active`
///
/// Paying when already subscribed extends the current period.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext,
    billing::{self, SubscriptionReceipt},
    models::subscription::{Subscription, SubscriptionView},
};
use uuid::Uuid;

/// Subscribe to a subject
///
/// # Errors
///
/// - `400 Bad Request`: Own subject, unapproved subject or no price set
/// - `404 Not Found`: Unknown subject
/// - `409 Conflict` (`insufficient_points`): Balance below the price
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(subject_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<SubscriptionReceipt>)> {
    let receipt = billing::subscribe(&state.db, subject_id, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_my_subscriptions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<SubscriptionView>>> {
    Ok(Json(
        Subscription::list_for_student(&state.db, auth.user_id).await?,
    ))
}
