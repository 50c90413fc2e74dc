//! Represents a bucket, the top-level container for objects.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::timestamp;

/// A bucket visible to the current project.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BucketEntry {
    /// Globally unique bucket name.
    pub name: String,

    /// When the bucket metadata was last changed.
    #[serde(rename = "updated", serialize_with = "timestamp::serialize")]
    pub updated_at: Option<DateTime<Utc>>,
}
