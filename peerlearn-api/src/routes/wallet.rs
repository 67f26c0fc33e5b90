/// Teacher wallet endpoints
///
/// # Endpoints
///
/// - `GET /v1/wallet` - Totals and available balance
/// - `GET /v1/wallet/earnings` - Earnings ledger, newest first
/// - `GET /v1/wallet/withdrawals` - Caller's withdrawal requests
/// - `POST /v1/wallet/withdrawals` - Request a payout
/// - `GET /v1/admin/withdrawals` - Admin queue, filter `status`
/// - `POST /v1/admin/withdrawals/:id/status` - Admin moves a request
///   `pending → approved | rejected`, `approved → paid | rejected`
///
/// ```text
/// available = earned - (pending + approved + paid)
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::{
        authorization::{require_current_role, require_role},
        middleware::AuthContext,
    },
    models::{
        earning::TeacherEarning,
        notification::{CreateNotification, NotificationKind},
        role::AppRole,
        withdrawal::{CreateWithdrawal, WithdrawalRequest, WithdrawalStatus},
    },
    notify,
    wallet::{self, WalletSummary},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawalRequestBody {
    pub amount: i64,

    #[validate(length(min = 2, max = 50, message = "Method must be 2-50 characters"))]
    pub method: String,

    #[validate(length(
        min = 4,
        max = 1000,
        message = "Account details must be 4-1000 characters"
    ))]
    pub account_details: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WithdrawalQuery {
    pub status: Option<WithdrawalStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawalStatusRequest {
    pub status: WithdrawalStatus,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<WalletSummary>> {
    require_role(&auth, AppRole::Teacher)?;
    Ok(Json(wallet::summary(&state.db, auth.user_id).await?))
}

pub async fn list_earnings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<TeacherEarning>>> {
    require_role(&auth, AppRole::Teacher)?;
    Ok(Json(
        TeacherEarning::list_for_teacher(&state.db, auth.user_id, page.limit(), page.offset())
            .await?,
    ))
}

pub async fn list_my_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<WithdrawalRequest>>> {
    require_role(&auth, AppRole::Teacher)?;
    Ok(Json(
        WithdrawalRequest::list_for_teacher(&state.db, auth.user_id).await?,
    ))
}

/// Request a payout
///
/// # Errors
///
/// - `400 Bad Request`: Amount not positive or below `min_withdrawal`
/// - `409 Conflict`: Amount exceeds the available balance
pub async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<WithdrawalRequestBody>,
) -> ApiResult<(StatusCode, Json<WithdrawalRequest>)> {
    require_role(&auth, AppRole::Teacher)?;
    req.validate()?;

    let request = wallet::request_withdrawal(
        &state.db,
        CreateWithdrawal {
            teacher_id: auth.user_id,
            amount: req.amount,
            method: req.method.trim().to_string(),
            account_details: req.account_details.trim().to_string(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<WithdrawalQuery>,
) -> ApiResult<Json<Vec<WithdrawalRequest>>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    Ok(Json(
        WithdrawalRequest::list(&state.db, query.status, page.limit(), page.offset()).await?,
    ))
}

pub async fn update_withdrawal_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<WithdrawalStatusRequest>,
) -> ApiResult<Json<WithdrawalRequest>> {
    require_current_role(&state.db, auth.user_id, AppRole::Admin).await?;
    req.validate()?;

    let current = WithdrawalRequest::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Withdrawal request not found".to_string()))?;

    if !current.status.can_transition_to(req.status) {
        return Err(ApiError::Conflict(format!(
            "Cannot move a {} withdrawal to {}",
            current.status.as_str(),
            req.status.as_str()
        )));
    }

    let updated = WithdrawalRequest::transition(
        &state.db,
        id,
        current.status,
        req.status,
        auth.user_id,
        non_blank(req.notes),
    )
    .await?
    .ok_or_else(|| ApiError::Conflict("Withdrawal status changed concurrently".to_string()))?;

    info!(
        withdrawal_id = %id,
        from = current.status.as_str(),
        to = updated.status.as_str(),
        admin = %auth.user_id,
        "Withdrawal status changed"
    );

    let mut notification = CreateNotification::new(
        updated.teacher_id,
        NotificationKind::WithdrawalUpdated,
        format!(
            "Your withdrawal of {} points is {}",
            updated.amount,
            updated.status.as_str()
        ),
    )
    .with_link("/wallet");
    if let Some(notes) = &updated.admin_notes {
        notification = notification.with_body(notes.clone());
    }
    notify::notify_logged(&state.db, &state.hub, notification).await;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_body_validation() {
        let ok = WithdrawalRequestBody {
            amount: 150,
            method: "bank_transfer".to_string(),
            account_details: "IBAN DE89 3704 0044 0532 0130 00".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = WithdrawalRequestBody {
            method: "x".to_string(),
            ..ok
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_status_request_parses() {
        let req: WithdrawalStatusRequest =
            serde_json::from_str(r#"{"status": "paid"}"#).unwrap();
        assert_eq!(req.status, WithdrawalStatus::Paid);
        assert!(req.notes.is_none());
    }
}
