use chrono::{DateTime, Utc};
use serde::Serialize;

use super::timestamp;

/// A synthetic folder, reconstructed from a common prefix of a delimited
/// listing. Always exactly one segment below the listed prefix.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PrefixGroup {
    /// Full prefix, ending in `/`.
    pub name: String,

    /// Most recent `updated` time of any object below this prefix.
    #[serde(rename = "updatedAt", serialize_with = "timestamp::serialize")]
    pub latest_updated_at: Option<DateTime<Utc>>,
}
