//! Frontend support endpoints: the credential bundle, the service URL map
//! and the client log relay.

use crate::{
    models::service_urls::ServiceUrls,
    services::{credentials::CredentialsError, storage_service::StorageService},
};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CredentialsResponse {
    pub access_token: String,
    pub project_id: String,
    pub region_id: String,
    /// 1 when the token command failed or returned an incomplete bundle.
    pub config_error: u8,
    /// 1 when no access token is available (the user is not logged in).
    pub login_error: u8,
}

/// GET `/credentials`: never fails; errors are reported in the flags.
pub async fn credentials(State(service): State<StorageService>) -> Json<CredentialsResponse> {
    let resp = match service.credentials.get().await {
        Ok(creds) => CredentialsResponse {
            access_token: creds.access_token,
            project_id: creds.project_id,
            region_id: creds.region_id,
            config_error: 0,
            login_error: 0,
        },
        Err(err) => {
            error!("Error fetching credentials: {}", err);
            let login_error = matches!(err, CredentialsError::Missing("access_token"));
            CredentialsResponse {
                access_token: String::new(),
                project_id: String::new(),
                region_id: String::new(),
                config_error: 1,
                login_error: u8::from(login_error),
            }
        }
    };
    Json(resp)
}

/// GET `/getGcpServiceUrls`: endpoints the frontend should call.
pub async fn service_urls(State(urls): State<ServiceUrls>) -> Json<ServiceUrls> {
    info!("Service URL map: {:?}", urls);
    Json(urls)
}

/// Level of a frontend log line: a Python-style number (10..=50) or a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ClientLevel {
    Numeric(u32),
    Named(String),
}

#[derive(Debug, Deserialize)]
pub struct ClientLog {
    pub level: ClientLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&ClientLevel> for Severity {
    fn from(level: &ClientLevel) -> Self {
        match level {
            ClientLevel::Numeric(n) if *n >= 40 => Severity::Error,
            ClientLevel::Numeric(n) if *n >= 30 => Severity::Warn,
            ClientLevel::Numeric(n) if *n >= 20 => Severity::Info,
            ClientLevel::Numeric(_) => Severity::Debug,
            ClientLevel::Named(name) => match name.to_ascii_lowercase().as_str() {
                "error" | "critical" | "fatal" => Severity::Error,
                "warn" | "warning" => Severity::Warn,
                "debug" | "trace" => Severity::Debug,
                _ => Severity::Info,
            },
        }
    }
}

/// POST `/log`: re-emit a frontend log line through the server's logger.
pub async fn client_log(Json(log): Json<ClientLog>) -> Json<Value> {
    match Severity::from(&log.level) {
        Severity::Error => error!(target: "frontend", "{}", log.message),
        Severity::Warn => warn!(target: "frontend", "{}", log.message),
        Severity::Info => info!(target: "frontend", "{}", log.message),
        Severity::Debug => debug!(target: "frontend", "{}", log.message),
    }
    Json(json!({"status": "OK"}))
}
