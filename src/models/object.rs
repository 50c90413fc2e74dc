//! Represents an object (file) stored in a bucket.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::timestamp;

/// A single stored object as seen by a listing or a write call.
///
/// Only metadata is carried here, never the payload. A name ending in `/`
/// is a folder marker written by `createFolder`; it is still an ordinary
/// object as far as listings are concerned.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object name (path-like key within the bucket).
    pub name: String,

    /// Creation time reported by the store.
    #[serde(rename = "timeCreated", serialize_with = "timestamp::serialize")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last modification time reported by the store.
    #[serde(rename = "updated", serialize_with = "timestamp::serialize")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Size in bytes.
    pub size: u64,

    /// MIME type, empty when the store did not record one.
    pub content_type: String,
}

/// The slice of an object the deep listing needs: its name and mtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectStamp {
    pub name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ObjectEntry> for ObjectStamp {
    fn from(entry: &ObjectEntry) -> Self {
        Self {
            name: entry.name.clone(),
            updated_at: entry.updated_at,
        }
    }
}
