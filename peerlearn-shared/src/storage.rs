/// Object storage for uploaded files
///
/// Files live in named buckets. Two buckets are public (any authenticated
/// user may download) and one is private (owner and admins only):
///
/// | Bucket | Visibility | Used for |
/// |---|---|---|
/// | `avatars` | public | profile pictures |
/// | `documents` | private | teacher application documents |
/// | `subject-files` | public | subject covers and post attachments |
///
/// The bytes go through an [`ObjectStore`]; [`LocalObjectStore`] keeps them
/// on disk under a root directory. Metadata rows are in
/// [`crate::models::storage_object`].

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Longest accepted object path
pub const MAX_PATH_LEN: usize = 1024;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object not found")]
    NotFound,

    #[error("Object exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },

    #[error("Not allowed to access this object")]
    Forbidden,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Storage buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Avatars,
    Documents,
    SubjectFiles,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Avatars, Bucket::Documents, Bucket::SubjectFiles];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Documents => "documents",
            Bucket::SubjectFiles => "subject-files",
        }
    }

    /// Public buckets are readable by every authenticated user
    pub fn is_public(&self) -> bool {
        !matches!(self, Bucket::Documents)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| StorageError::UnknownBucket(s.to_string()))
    }
}

/// Validates an object path and returns it in canonical form
///
/// Paths are relative, `/`-separated, and may not contain empty, `.` or
/// `..` segments, backslashes or control characters.
pub fn normalize_object_path(raw: &str) -> Result<String, StorageError> {
    let trimmed = raw.trim_matches('/');
    let invalid = || StorageError::InvalidPath(raw.to_string());

    if trimmed.is_empty() || trimmed.len() > MAX_PATH_LEN || raw.starts_with("//") {
        return Err(invalid());
    }
    if trimmed.chars().any(|c| c == '\\' || c.is_control()) {
        return Err(invalid());
    }
    if trimmed
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

/// SHA-256 of `data` as lowercase hex
pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Backend that stores object bytes
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes (or overwrites) an object
    async fn put(&self, bucket: Bucket, path: &str, data: Bytes) -> Result<(), StorageError>;

    /// Reads an object; [`StorageError::NotFound`] if absent
    async fn get(&self, bucket: Bucket, path: &str) -> Result<Bytes, StorageError>;

    /// Deletes an object; returns false if it did not exist
    async fn delete(&self, bucket: Bucket, path: &str) -> Result<bool, StorageError>;
}

/// Filesystem-backed store: `<root>/<bucket>/<path>`
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: Bucket, path: &str) -> Result<PathBuf, StorageError> {
        let path = normalize_object_path(path)?;
        Ok(self.root.join(bucket.as_str()).join(path))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bucket: Bucket, path: &str, data: Bytes) -> Result<(), StorageError> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Temp file + rename: readers see the old or the new object, never half of one.
        let tmp = target.with_extension(format!("upload-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(bucket = %bucket, path, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, bucket: Bucket, path: &str) -> Result<Bytes, StorageError> {
        let target = self.object_path(bucket, path)?;
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, bucket: Bucket, path: &str) -> Result<bool, StorageError> {
        let target = self.object_path(bucket, path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalObjectStore {
        let dir = std::env::temp_dir().join(format!("peerlearn-storage-{}", uuid::Uuid::new_v4()));
        LocalObjectStore::new(dir)
    }

    #[test]
    fn test_bucket_parsing() {
        assert_eq!("avatars".parse::<Bucket>().unwrap(), Bucket::Avatars);
        assert_eq!("subject-files".parse::<Bucket>().unwrap(), Bucket::SubjectFiles);
        assert!(matches!(
            "secrets".parse::<Bucket>(),
            Err(StorageError::UnknownBucket(_))
        ));
        assert!(Bucket::Avatars.is_public());
        assert!(!Bucket::Documents.is_public());
    }

    #[test]
    fn test_normalize_object_path() {
        assert_eq!(normalize_object_path("a/b.png").unwrap(), "a/b.png");
        assert_eq!(normalize_object_path("/a/b.png/").unwrap(), "a/b.png");

        for bad in ["", "/", "../etc/passwd", "a/../../b", "a//b", "./a", "a\\b", "//etc/passwd", "a/\u{0}b"] {
            assert!(
                matches!(normalize_object_path(bad), Err(StorageError::InvalidPath(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_checksum() {
        assert_eq!(
            checksum(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let store = temp_store();

        store
            .put(Bucket::Avatars, "u1/me.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        let data = store.get(Bucket::Avatars, "u1/me.png").await.unwrap();
        assert_eq!(&data[..], b"png");

        store
            .put(Bucket::Avatars, "u1/me.png", Bytes::from_static(b"png2"))
            .await
            .unwrap();
        let data = store.get(Bucket::Avatars, "u1/me.png").await.unwrap();
        assert_eq!(&data[..], b"png2");

        assert!(store.delete(Bucket::Avatars, "u1/me.png").await.unwrap());
        assert!(!store.delete(Bucket::Avatars, "u1/me.png").await.unwrap());
        assert!(matches!(
            store.get(Bucket::Avatars, "u1/me.png").await,
            Err(StorageError::NotFound)
        ));

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_local_store_rejects_traversal() {
        let store = temp_store();
        assert!(matches!(
            store.put(Bucket::Documents, "../escape", Bytes::new()).await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
