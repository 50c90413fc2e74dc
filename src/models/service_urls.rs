//! Endpoint map handed to the notebook frontend.

use serde::Serialize;

/// Google service endpoints the frontend talks to, keyed by service name.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ServiceUrls {
    /// Root of the Cloud Storage JSON API.
    pub storage: String,
}

impl ServiceUrls {
    pub fn new(storage_api_url: impl Into<String>) -> Self {
        Self {
            storage: storage_api_url.into(),
        }
    }
}
