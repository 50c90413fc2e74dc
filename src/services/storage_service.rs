//! StorageService: the operations behind the HTTP API.
//!
//! Wraps an [`ObjectStore`] and the credential broker. Listing goes through
//! the reconciler; everything else is a thin pass-through with the input
//! checks the frontend relies on (folder path composition, refusing to delete
//! folders, existence checks before delete and rename).

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::{
    models::{
        bucket::BucketEntry,
        listing::{DELIMITER, ListingRequest, ListingResult},
        object::ObjectEntry,
    },
    services::{
        credentials::CredentialProvider,
        listing_service,
        object_store::{ObjectStore, StorageError, StorageResult},
    },
};

/// How `load_file` should hand the object back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileFormat {
    #[default]
    Text,
    Json,
    Base64,
}

impl FileFormat {
    /// Unknown or missing values fall back to text.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("base64") => Self::Base64,
            _ => Self::Text,
        }
    }
}

/// Object name of a new folder `folder_name` inside `path`.
///
/// An empty path means the bucket root; a trailing delimiter on `path` is
/// not doubled.
pub fn folder_object_name(path: &str, folder_name: &str) -> String {
    let parent = path.trim_end_matches(DELIMITER);
    let folder = folder_name.trim_matches('/');
    if parent.is_empty() {
        format!("{folder}{DELIMITER}")
    } else {
        format!("{parent}{DELIMITER}{folder}{DELIMITER}")
    }
}

#[derive(Clone)]
pub struct StorageService {
    /// Backend every request is forwarded to.
    pub store: Arc<dyn ObjectStore>,

    /// Credential broker shared with the backend.
    pub credentials: CredentialProvider,
}

impl StorageService {
    pub fn new(store: Arc<dyn ObjectStore>, credentials: CredentialProvider) -> Self {
        Self { store, credentials }
    }

    pub async fn list_buckets(&self, prefix: Option<&str>) -> StorageResult<Vec<BucketEntry>> {
        self.store.list_buckets(prefix).await
    }

    /// Folders and files directly below `prefix`.
    pub async fn list_files(&self, bucket: &str, prefix: &str) -> StorageResult<ListingResult> {
        let request = ListingRequest::new(bucket, prefix);
        listing_service::reconcile(self.store.as_ref(), &request).await
    }

    pub async fn create_folder(
        &self,
        bucket: &str,
        path: &str,
        folder_name: &str,
    ) -> StorageResult<ObjectEntry> {
        let name = folder_object_name(path, folder_name);
        let folder = self.store.create_folder(bucket, &name).await?;
        info!("created folder gs://{}/{}", bucket, folder.name);
        Ok(folder)
    }

    /// Delete a single file. Folder markers and the bucket root are refused.
    pub async fn delete_file(&self, bucket: &str, path: &str) -> StorageResult<()> {
        if path.is_empty() || path.ends_with(DELIMITER) {
            return Err(StorageError::FolderDeletion);
        }
        if !self.store.object_exists(bucket, path).await? {
            return Err(StorageError::FileNotFound);
        }
        self.store.delete_object(bucket, path).await?;
        info!("deleted gs://{}/{}", bucket, path);
        Ok(())
    }

    pub async fn rename_file(
        &self,
        bucket: &str,
        old_name: &str,
        new_name: &str,
    ) -> StorageResult<ObjectEntry> {
        if !self.store.object_exists(bucket, old_name).await? {
            return Err(StorageError::SourceNotFound(old_name.to_string()));
        }
        let renamed = self.store.rename_object(bucket, old_name, new_name).await?;
        info!("renamed gs://{}/{} to {}", bucket, old_name, renamed.name);
        Ok(renamed)
    }

    /// Store `contents` at `path`. Strings are written verbatim as text;
    /// any other JSON value is serialized first.
    pub async fn save_content(
        &self,
        bucket: &str,
        path: &str,
        contents: &Value,
    ) -> StorageResult<ObjectEntry> {
        let (bytes, content_type) = match contents {
            Value::String(text) => (Bytes::from(text.clone()), "text/plain"),
            other => (Bytes::from(other.to_string()), "application/json"),
        };
        self.store
            .save_content(bucket, path, bytes, content_type)
            .await
    }

    /// Read an object back as a JSON value in the requested format.
    pub async fn load_file(
        &self,
        bucket: &str,
        path: &str,
        format: FileFormat,
    ) -> StorageResult<Value> {
        let bytes = self.store.download_object(bucket, path).await?;
        Ok(match format {
            FileFormat::Base64 => Value::String(general_purpose::STANDARD.encode(&bytes)),
            FileFormat::Json => {
                serde_json::from_slice(&bytes).map_err(|source| StorageError::InvalidJson {
                    name: path.to_string(),
                    source,
                })?
            }
            FileFormat::Text => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|source| {
                    StorageError::InvalidText {
                        name: path.to_string(),
                        source,
                    }
                })?;
                Value::String(text)
            }
        })
    }

    pub async fn download(&self, bucket: &str, path: &str) -> StorageResult<Bytes> {
        self.store.download_object(bucket, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        credentials::Credentials,
        testing::{BUCKET, FakeStore, entry},
    };
    use serde_json::json;

    fn service(store: FakeStore) -> (StorageService, Arc<FakeStore>) {
        let store = Arc::new(store);
        let creds = CredentialProvider::fixed(Credentials {
            access_token: "fake-token".into(),
            project_id: "test-project".into(),
            region_id: "us-central1".into(),
        });
        (StorageService::new(store.clone(), creds), store)
    }

    #[test]
    fn folder_names_compose_from_path() {
        assert_eq!(folder_object_name("", "new_folder"), "new_folder/");
        assert_eq!(folder_object_name("parent", "new_folder"), "parent/new_folder/");
        assert_eq!(folder_object_name("parent/", "new_folder"), "parent/new_folder/");
        assert_eq!(folder_object_name("a/b", "c/"), "a/b/c/");
    }

    #[test]
    fn unknown_format_is_text() {
        assert_eq!(FileFormat::from_param(None), FileFormat::Text);
        assert_eq!(FileFormat::from_param(Some("BASE64")), FileFormat::Base64);
        assert_eq!(FileFormat::from_param(Some("json")), FileFormat::Json);
        assert_eq!(FileFormat::from_param(Some("yaml")), FileFormat::Text);
    }

    #[tokio::test]
    async fn list_files_normalizes_prefix() {
        let (svc, _) = service(FakeStore::new(vec![entry("a/b.txt", None)]));
        let listing = svc.list_files(BUCKET, "a").await.unwrap();
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "a/b.txt");
    }

    #[tokio::test]
    async fn create_folder_writes_marker() {
        let (svc, store) = service(FakeStore::new(vec![]));
        let folder = svc.create_folder(BUCKET, "parent", "child").await.unwrap();
        assert_eq!(folder.name, "parent/child/");
        assert_eq!(folder.size, 0);
        assert_eq!(store.names(), vec!["parent/child/"]);
    }

    #[tokio::test]
    async fn delete_refuses_folders_and_root() {
        let (svc, store) = service(FakeStore::new(vec![entry("dir/", None)]));
        for path in ["dir/", ""] {
            let err = svc.delete_file(BUCKET, path).await.unwrap_err();
            assert!(matches!(err, StorageError::FolderDeletion));
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_file_is_not_found() {
        let (svc, store) = service(FakeStore::new(vec![]));
        let err = svc.delete_file(BUCKET, "ghost.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound));
        assert_eq!(store.calls(), vec!["object_exists"]);
    }

    #[tokio::test]
    async fn delete_existing_file() {
        let (svc, store) = service(FakeStore::new(vec![entry("a.txt", None)]));
        svc.delete_file(BUCKET, "a.txt").await.unwrap();
        assert!(store.names().is_empty());
    }

    #[tokio::test]
    async fn rename_moves_object() {
        let (svc, store) = service(FakeStore::new(vec![entry("old.txt", None)]));
        let renamed = svc.rename_file(BUCKET, "old.txt", "new.txt").await.unwrap();
        assert_eq!(renamed.name, "new.txt");
        assert_eq!(store.names(), vec!["new.txt"]);
    }

    #[tokio::test]
    async fn rename_missing_source_skips_rename() {
        let (svc, store) = service(FakeStore::new(vec![]));
        let err = svc.rename_file(BUCKET, "old.txt", "new.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "Source file old.txt not found");
        assert_eq!(store.calls(), vec!["object_exists"]);
    }

    #[tokio::test]
    async fn save_text_and_json() {
        let (svc, _) = service(FakeStore::new(vec![]));
        let text = svc
            .save_content(BUCKET, "note.txt", &json!("hello"))
            .await
            .unwrap();
        assert_eq!(text.size, 5);
        assert_eq!(text.content_type, "text/plain");

        let doc = svc
            .save_content(BUCKET, "nb.ipynb", &json!({"cells": []}))
            .await
            .unwrap();
        assert_eq!(doc.size, r#"{"cells":[]}"#.len() as u64);
        assert_eq!(doc.content_type, "application/json");
    }

    #[tokio::test]
    async fn load_file_formats() {
        let store = FakeStore::new(vec![])
            .with_content("hello.txt", b"hello")
            .with_content("doc.json", br#"{"k": 1}"#);
        let (svc, _) = service(store);

        let text = svc.load_file(BUCKET, "hello.txt", FileFormat::Text).await.unwrap();
        assert_eq!(text, json!("hello"));

        let b64 = svc.load_file(BUCKET, "hello.txt", FileFormat::Base64).await.unwrap();
        assert_eq!(b64, json!("aGVsbG8="));

        let doc = svc.load_file(BUCKET, "doc.json", FileFormat::Json).await.unwrap();
        assert_eq!(doc, json!({"k": 1}));

        let err = svc
            .load_file(BUCKET, "hello.txt", FileFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidJson { .. }));
    }

    #[tokio::test]
    async fn text_load_rejects_invalid_utf8() {
        let store = FakeStore::new(vec![]).with_content("blob.bin", &[0x66, 0xff, 0xfe]);
        let (svc, _) = service(store);

        let err = svc
            .load_file(BUCKET, "blob.bin", FileFormat::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidText { ref name, .. } if name == "blob.bin"));

        let b64 = svc.load_file(BUCKET, "blob.bin", FileFormat::Base64).await.unwrap();
        assert_eq!(b64, json!("Zv/+"));
    }
}
