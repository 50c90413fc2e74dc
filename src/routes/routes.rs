//! Defines routes for the Cloud Storage browser API.
//!
//! ## Structure
//! - **Probes** (mounted at root)
//!   - `GET  /healthz`, `GET /readyz`
//!
//! - **Frontend support** (under `/gcs-jupyter-plugin`)
//!   - `GET  /credentials` returns the current credential bundle
//!   - `GET  /getGcpServiceUrls` returns the service endpoint map
//!   - `POST /log` relays a frontend log line
//!
//! - **Storage** (under `/gcs-jupyter-plugin/api/storage`)
//!   - `GET  /listBuckets`, `GET /listFiles`
//!   - `POST /createFolder`, `POST /deleteFile`, `POST /renameFile`, `POST /saveFile`
//!   - `GET  /loadFile`, `GET /downloadFile`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        plugin_handlers::{client_log, credentials, service_urls},
        storage_handlers::{
            create_folder, delete_file, download_file, list_buckets, list_files, load_file,
            rename_file, save_file,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// URL namespace shared with the notebook frontend.
pub const BASE_PATH: &str = "/gcs-jupyter-plugin";

/// Build and return the router for all routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    let storage = Router::new()
        .route("/listBuckets", get(list_buckets))
        .route("/listFiles", get(list_files))
        .route("/createFolder", post(create_folder))
        .route("/deleteFile", post(delete_file))
        .route("/renameFile", post(rename_file))
        .route("/saveFile", post(save_file))
        .route("/loadFile", get(load_file))
        .route("/downloadFile", get(download_file));

    let plugin = Router::new()
        .route("/credentials", get(credentials))
        .route("/getGcpServiceUrls", get(service_urls))
        .route("/log", post(client_log))
        .nest("/api/storage", storage);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest(BASE_PATH, plugin)
}
