//! Port to the object store.
//!
//! Handlers and the listing reconciler only see this trait; the Cloud Storage
//! adapter lives in `gcs_store` and tests use the in-memory double from
//! `testing`.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::{
    models::{
        bucket::BucketEntry,
        listing::ObjectListing,
        object::{ObjectEntry, ObjectStamp},
    },
    services::credentials::CredentialsError,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not authorized to access Cloud Storage: {0}")]
    Unauthorized(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("object `{name}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, name: String },
    #[error("Cloud Storage request failed ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid Cloud Storage response: {0}")]
    InvalidResponse(String),
    #[error("Deleting Folder/Bucket is not allowed")]
    FolderDeletion,
    #[error("File not found")]
    FileNotFound,
    #[error("Source file {0} not found")]
    SourceNotFound(String),
    #[error("object `{name}` is not valid UTF-8 text")]
    InvalidText {
        name: String,
        source: std::string::FromUtf8Error,
    },
    #[error("object `{name}` is not valid JSON: {source}")]
    InvalidJson {
        name: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Network(#[from] reqwest::Error),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Operations the browser needs from an object store.
///
/// Listing methods never treat an empty result as an error; a missing
/// prefix simply yields nothing. A missing bucket is an error.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Buckets of the current project, optionally filtered by name prefix.
    async fn list_buckets(&self, prefix: Option<&str>) -> StorageResult<Vec<BucketEntry>>;

    /// One level of `bucket` below `prefix`, grouped on `delimiter`.
    async fn list_shallow(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> StorageResult<ObjectListing>;

    /// Every object at or below `prefix`, recursively.
    async fn list_deep(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectStamp>>;

    async fn object_exists(&self, bucket: &str, name: &str) -> StorageResult<bool>;

    /// Write an empty object at `name` (which ends in `/`).
    async fn create_folder(&self, bucket: &str, name: &str) -> StorageResult<ObjectEntry>;

    async fn delete_object(&self, bucket: &str, name: &str) -> StorageResult<()>;

    /// Move `from` to `to` within `bucket`.
    async fn rename_object(&self, bucket: &str, from: &str, to: &str)
    -> StorageResult<ObjectEntry>;

    async fn save_content(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        content_type: &str,
    ) -> StorageResult<ObjectEntry>;

    async fn download_object(&self, bucket: &str, name: &str) -> StorageResult<Bytes>;
}
