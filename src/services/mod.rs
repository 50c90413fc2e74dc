pub mod credentials;
pub mod gcs_store;
pub mod listing_service;
pub mod object_store;
pub mod storage_service;

#[cfg(test)]
pub mod testing;
