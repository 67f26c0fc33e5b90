/// Object storage endpoints
///
/// # Endpoints
///
/// - `PUT /v1/storage/:bucket/*path` - Upload the raw request body;
///   `Content-Type` is stored with the object. Re-uploading overwrites, but
///   only for the owner (or an admin). The metadata row is claimed before
///   the bytes are written and stays locked until they are, so concurrent
///   first uploads to one path cannot mix owners and content.
/// - `GET /v1/storage/:bucket/*path` - Download. Public buckets are open to
///   any authenticated user; private ones to the owner and admins.
/// - `DELETE /v1/storage/:bucket/*path` - Owner or admin
/// - `GET /v1/storage/:bucket` - Caller's objects in a bucket
///
/// Bytes are kept by the [`ObjectStore`](peerlearn_shared::storage::ObjectStore)
/// in `AppState`; metadata rows record owner, size and SHA-256 checksum.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use peerlearn_shared::{
    auth::middleware::AuthContext,
    models::storage_object::{PutObject, StorageObject},
    storage::{checksum, normalize_object_path, Bucket, StorageError},
};
use sqlx::PgPool;
use tracing::info;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Parses the bucket and path segments of a storage URL
fn locate(bucket: &str, path: &str) -> Result<(Bucket, String), StorageError> {
    Ok((bucket.parse()?, normalize_object_path(path)?))
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

async fn find_object(pool: &PgPool, bucket: Bucket, path: &str) -> ApiResult<StorageObject> {
    StorageObject::find(pool, bucket.as_str(), path)
        .await?
        .ok_or_else(|| ApiError::from(StorageError::NotFound))
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<StorageObject>)> {
    let limit = state.config.storage.max_upload_bytes;
    if body.len() > limit {
        return Err(StorageError::TooLarge { limit }.into());
    }

    let (bucket, path) = locate(&bucket, &path)?;

    let size_bytes = body.len() as i64;
    let mut tx = state.db.begin().await?;

    let claimed = StorageObject::claim(
        &mut *tx,
        PutObject {
            bucket: bucket.as_str().to_string(),
            path: path.clone(),
            owner_id: auth.user_id,
            content_type: content_type(&headers),
            size_bytes,
            checksum: checksum(&body),
        },
        auth.is_admin(),
    )
    .await?
    .ok_or(StorageError::Forbidden)?;

    state.storage.put(bucket, &path, body).await?;
    tx.commit().await?;

    info!(
        bucket = bucket.as_str(),
        path = %path,
        size_bytes,
        overwrite = !claimed.inserted,
        "Object stored"
    );

    let status = if claimed.inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(claimed.object)))
}

pub async fn download(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((bucket, path)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (bucket, path) = locate(&bucket, &path)?;
    let object = find_object(&state.db, bucket, &path).await?;

    if !bucket.is_public() && !auth.owns_or_admin(object.owner_id) {
        return Err(StorageError::Forbidden.into());
    }

    let data = state.storage.get(bucket, &path).await?;
    let content_type = HeaderValue::from_str(&object.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static(if bucket.is_public() {
                    "public, max-age=300"
                } else {
                    "private, no-store"
                }),
            ),
        ],
        data,
    )
        .into_response())
}

pub async fn delete_object(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((bucket, path)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let (bucket, path) = locate(&bucket, &path)?;
    let object = find_object(&state.db, bucket, &path).await?;

    if !auth.owns_or_admin(object.owner_id) {
        return Err(StorageError::Forbidden.into());
    }

    state.storage.delete(bucket, &path).await?;
    StorageObject::delete(&state.db, bucket.as_str(), &path).await?;

    info!(bucket = bucket.as_str(), path = %path, deleted_by = %auth.user_id, "Object deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_objects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(bucket): Path<String>,
) -> ApiResult<Json<Vec<StorageObject>>> {
    let bucket: Bucket = bucket.parse()?;
    Ok(Json(
        StorageObject::list_for_owner(&state.db, bucket.as_str(), auth.user_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_rejects_traversal() {
        assert!(locate("avatars", "u/me.png").is_ok());
        assert!(matches!(
            locate("avatars", "../etc/passwd"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            locate("secrets", "a.txt"),
            Err(StorageError::UnknownBucket(_))
        ));
    }

    #[test]
    fn test_content_type_defaults() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_type(&headers), DEFAULT_CONTENT_TYPE);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert_eq!(content_type(&headers), "image/png");
    }
}
