/// Metadata rows for stored objects
///
/// The bytes live in an [`crate::storage::ObjectStore`]; this table records
/// who owns each object and what it contains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StorageObject {
    pub id: Uuid,
    pub bucket: String,
    pub path: String,
    pub owner_id: Uuid,
    pub content_type: String,
    pub size_bytes: i64,
    /// SHA-256 of the content, lowercase hex
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PutObject {
    pub bucket: String,
    pub path: String,
    /// Owner for a new row; the caller when overwriting
    pub owner_id: Uuid,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum: String,
}

/// Row returned by [`StorageObject::claim`]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimedObject {
    #[sqlx(flatten)]
    pub object: StorageObject,
    /// `false` when an existing object was overwritten
    pub inserted: bool,
}

const OBJECT_COLUMNS: &str =
    "id, bucket, path, owner_id, content_type, size_bytes, checksum, created_at, updated_at";

impl StorageObject {
    pub async fn find(pool: &PgPool, bucket: &str, path: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM storage_objects WHERE bucket = $1 AND path = $2",
            OBJECT_COLUMNS
        );

        sqlx::query_as::<_, StorageObject>(&sql)
            .bind(bucket)
            .bind(path)
            .fetch_optional(pool)
            .await
    }

    /// Inserts the row, or updates an existing row the caller may overwrite
    ///
    /// An existing row is only updated when `caller` owns it or
    /// `caller_is_admin`; otherwise `None` is returned and nothing changes.
    /// Ownership never changes on overwrite. Run inside a transaction and
    /// write the bytes before committing: the row stays locked until then,
    /// so a concurrent upload to the same path waits and is checked against
    /// the winner's row.
    pub async fn claim(
        executor: impl PgExecutor<'_>,
        data: PutObject,
        caller_is_admin: bool,
    ) -> Result<Option<ClaimedObject>, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO storage_objects (bucket, path, owner_id, content_type, size_bytes, checksum)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT storage_objects_bucket_path_key DO UPDATE
                SET content_type = EXCLUDED.content_type,
                    size_bytes = EXCLUDED.size_bytes,
                    checksum = EXCLUDED.checksum,
                    updated_at = NOW()
                WHERE storage_objects.owner_id = EXCLUDED.owner_id OR $7
            RETURNING {}, (xmax = 0) AS inserted
            "#,
            OBJECT_COLUMNS
        );

        sqlx::query_as::<_, ClaimedObject>(&sql)
            .bind(data.bucket)
            .bind(data.path)
            .bind(data.owner_id)
            .bind(data.content_type)
            .bind(data.size_bytes)
            .bind(data.checksum)
            .bind(caller_is_admin)
            .fetch_optional(executor)
            .await
    }

    pub async fn delete(pool: &PgPool, bucket: &str, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM storage_objects WHERE bucket = $1 AND path = $2")
            .bind(bucket)
            .bind(path)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Objects a user owns in a bucket, newest first
    pub async fn list_for_owner(
        pool: &PgPool,
        bucket: &str,
        owner_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM storage_objects WHERE bucket = $1 AND owner_id = $2 \
             ORDER BY updated_at DESC",
            OBJECT_COLUMNS
        );

        sqlx::query_as::<_, StorageObject>(&sql)
            .bind(bucket)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }
}
