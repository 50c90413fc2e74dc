//! Wire rendering of optional timestamps.
//!
//! The frontend expects naive ISO-8601 strings in UTC (`2023-01-10T00:00:00`,
//! with fractional seconds only when non-zero) and an empty string when the
//! store did not report a time.

use chrono::{DateTime, Utc};
use serde::Serializer;

pub fn format(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        .unwrap_or_default()
}

/// `serialize_with` adapter for `Option<DateTime<Utc>>` fields.
pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(ts.as_ref()))
}
