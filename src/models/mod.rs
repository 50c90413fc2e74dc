//! Core data models for the Cloud Storage browser.
//!
//! Everything here is request-scoped: built from a store response, serialized
//! into the wire JSON and dropped. Nothing is persisted or shared between
//! requests.

pub mod bucket;
pub mod listing;
pub mod object;
pub mod prefix;
pub mod service_urls;
pub mod timestamp;
