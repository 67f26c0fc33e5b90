/// Notification endpoints
///
/// - `GET /v1/notifications` - Newest first; `unread_only`, `limit`, `offset`
/// - `GET /v1/notifications/unread-count`
/// - `POST /v1/notifications/:id/read`
/// - `POST /v1/notifications/read-all` - Also pushes the new count (zero)
///   to the caller's realtime stream

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::Pagination,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use peerlearn_shared::{
    auth::middleware::AuthContext, models::notification::Notification,
    realtime::RealtimePayload,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub marked: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };

    Ok(Json(
        Notification::list(
            &state.db,
            auth.user_id,
            query.unread_only,
            page.limit(),
            page.offset(),
        )
        .await?,
    ))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread = Notification::unread_count(&state.db, auth.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Notification::mark_read(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let marked = Notification::mark_all_read(&state.db, auth.user_id).await?;
    state
        .hub
        .publish(auth.user_id, RealtimePayload::UnreadCount { unread: 0 });

    Ok(Json(MarkAllReadResponse { marked }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_from_urlencoded() {
        let uri: axum::http::Uri = "/v1/notifications?unread_only=true&limit=5".parse().unwrap();
        let Query(query) = Query::<NotificationQuery>::try_from_uri(&uri).unwrap();
        assert!(query.unread_only);
        assert_eq!(query.limit, Some(5));

        let uri: axum::http::Uri = "/v1/notifications".parse().unwrap();
        let Query(query) = Query::<NotificationQuery>::try_from_uri(&uri).unwrap();
        assert!(!query.unread_only);
    }
}
