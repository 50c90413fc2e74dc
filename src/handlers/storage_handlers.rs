//! HTTP handlers for bucket and object operations.
//!
//! Request validation and the wire JSON shapes the notebook frontend expects
//! live here; the operations themselves are delegated to `StorageService`.

use crate::{
    errors::AppError,
    models::{
        bucket::BucketEntry, listing::ListingResult, object::ObjectEntry, prefix::PrefixGroup,
        timestamp,
    },
    services::storage_service::{FileFormat, StorageService},
};
use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// `{"items": ...}` wrapper used for files and buckets.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: T,
}

/// `{"prefixes": ...}` wrapper used for folders.
#[derive(Debug, Serialize)]
pub struct Prefixes<T> {
    pub prefixes: T,
}

/// Body of `GET listFiles`.
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub prefixes: Vec<Prefixes<PrefixGroup>>,
    pub files: Vec<Items<ObjectEntry>>,
}

impl From<ListingResult> for ListFilesResponse {
    fn from(result: ListingResult) -> Self {
        Self {
            prefixes: result
                .prefixes
                .into_iter()
                .map(|prefixes| Prefixes { prefixes })
                .collect(),
            files: result
                .files
                .into_iter()
                .map(|items| Items { items })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListBucketsQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderReq {
    pub bucket: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "folderName")]
    pub folder_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFileReq {
    pub bucket: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameFileReq {
    pub bucket: Option<String>,
    #[serde(rename = "oldName")]
    pub old_name: Option<String>,
    #[serde(rename = "newName")]
    pub new_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveFileReq {
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub contents: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct LoadFileQuery {
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadFileQuery {
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub name: Option<String>,
}

/// Reject absent or blank parameters with the canonical 400.
fn required(value: Option<String>) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(AppError::missing_parameters)
}

/// GET `listBuckets?prefix=`: buckets of the current project.
pub async fn list_buckets(
    State(service): State<StorageService>,
    Query(q): Query<ListBucketsQuery>,
) -> Result<Json<Vec<Items<BucketEntry>>>, AppError> {
    let buckets = service.list_buckets(q.prefix.as_deref()).await?;
    Ok(Json(
        buckets.into_iter().map(|items| Items { items }).collect(),
    ))
}

/// GET `listFiles?bucket=&prefix=`: folders and files of one level.
pub async fn list_files(
    State(service): State<StorageService>,
    Query(q): Query<ListFilesQuery>,
) -> Result<Json<ListFilesResponse>, AppError> {
    let bucket = required(q.bucket)?;
    let prefix = q.prefix.unwrap_or_default();
    let listing = service.list_files(&bucket, &prefix).await?;
    Ok(Json(listing.into()))
}

/// POST `createFolder`: write an empty `path/folderName/` marker object.
pub async fn create_folder(
    State(service): State<StorageService>,
    Json(req): Json<CreateFolderReq>,
) -> Result<Json<Value>, AppError> {
    let bucket = required(req.bucket)?;
    let folder_name = required(req.folder_name)?;
    if folder_name.trim_matches('/').trim().is_empty() {
        return Err(AppError::missing_parameters());
    }
    let path = req.path.unwrap_or_default();

    let folder = service.create_folder(&bucket, &path, &folder_name).await?;
    Ok(Json(json!({
        "name": folder.name,
        "bucket": bucket,
        "id": format!("{}/{}", bucket, folder.name),
        "kind": "storage#object",
        "contentType": folder.content_type,
        "timeCreated": timestamp::format(folder.created_at.as_ref()),
        "updated": timestamp::format(folder.updated_at.as_ref()),
        "size": folder.size.to_string(),
    })))
}

/// POST `deleteFile`: delete one file; folders are refused.
pub async fn delete_file(
    State(service): State<StorageService>,
    Json(req): Json<DeleteFileReq>,
) -> Result<StatusCode, AppError> {
    let bucket = required(req.bucket)?;
    let path = required(req.path)?;
    service.delete_file(&bucket, &path).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `renameFile`: move an object within its bucket.
pub async fn rename_file(
    State(service): State<StorageService>,
    Json(req): Json<RenameFileReq>,
) -> Result<Json<Value>, AppError> {
    let bucket = required(req.bucket)?;
    let old_name = required(req.old_name)?;
    let new_name = required(req.new_name)?;

    let renamed = service.rename_file(&bucket, &old_name, &new_name).await?;
    Ok(Json(json!({
        "name": renamed.name,
        "bucket": bucket,
        "success": true,
    })))
}

/// POST `saveFile`: upload text or JSON contents to `path`.
pub async fn save_file(
    State(service): State<StorageService>,
    Json(req): Json<SaveFileReq>,
) -> Result<Json<Value>, AppError> {
    let bucket = required(req.bucket)?;
    let path = required(req.path)?;
    let contents = req.contents.ok_or_else(AppError::missing_parameters)?;

    let saved = service.save_content(&bucket, &path, &contents).await?;
    Ok(Json(json!({
        "name": saved.name,
        "bucket": bucket,
        "size": saved.size,
        "contentType": saved.content_type,
        "timeCreated": timestamp::format(saved.created_at.as_ref()),
        "updated": timestamp::format(saved.updated_at.as_ref()),
        "success": true,
    })))
}

/// GET `loadFile?bucket=&path=&format=`: file contents as text, parsed
/// JSON or base64.
pub async fn load_file(
    State(service): State<StorageService>,
    Query(q): Query<LoadFileQuery>,
) -> Result<Json<Value>, AppError> {
    let bucket = required(q.bucket)?;
    let path = required(q.path)?;
    let format = FileFormat::from_param(q.format.as_deref());
    Ok(Json(service.load_file(&bucket, &path, format).await?))
}

/// GET `downloadFile?bucket=&path=&name=`: raw bytes as an attachment.
pub async fn download_file(
    State(service): State<StorageService>,
    Query(q): Query<DownloadFileQuery>,
) -> Result<Response, AppError> {
    let bucket = required(q.bucket)?;
    let path = required(q.path)?;
    let bytes = service.download(&bucket, &path).await?;

    let filename = q
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());

    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
