use axum::extract::FromRef;

use crate::{models::service_urls::ServiceUrls, services::storage_service::StorageService};

/// Router state. Handlers extract only the part they need.
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageService,
    pub service_urls: ServiceUrls,
}

impl AppState {
    pub fn new(storage: StorageService, service_urls: ServiceUrls) -> Self {
        Self {
            storage,
            service_urls,
        }
    }
}

impl FromRef<AppState> for StorageService {
    fn from_ref(state: &AppState) -> Self {
        state.storage.clone()
    }
}

impl FromRef<AppState> for ServiceUrls {
    fn from_ref(state: &AppState) -> Self {
        state.service_urls.clone()
    }
}
