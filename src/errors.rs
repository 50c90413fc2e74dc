use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::object_store::StorageError;

/// An HTTP-facing error: a status code plus the message shown to the client.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// The canonical 400 for absent query or body fields.
    pub fn missing_parameters() -> Self {
        Self::bad_request("Missing required parameters")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        } else {
            tracing::warn!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::Unauthorized(_) | StorageError::Credentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            StorageError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            StorageError::BucketNotFound(_)
            | StorageError::ObjectNotFound { .. }
            | StorageError::FileNotFound
            | StorageError::SourceNotFound(_)
            | StorageError::FolderDeletion => StatusCode::NOT_FOUND,
            StorageError::InvalidJson { .. } | StorageError::InvalidText { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            // client-side problems the API reports (bad name, precondition, quota)
            StorageError::Api { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            StorageError::Api { .. }
            | StorageError::Network(_)
            | StorageError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        };
        AppError::new(status, err.to_string())
    }
}
