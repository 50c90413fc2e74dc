//! Listing requests and results for the hierarchical file browser.

use super::{object::ObjectEntry, prefix::PrefixGroup};

/// Path delimiter used to reconstruct folders from object names.
pub const DELIMITER: &str = "/";

/// One directory level of a bucket to list.
///
/// The prefix is normalized at construction: a non-empty prefix always ends
/// in [`DELIMITER`], so `reports` and `reports/` address the same folder and a
/// prefix is never used as a partial-segment filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRequest {
    pub bucket: String,
    pub prefix: String,
}

impl ListingRequest {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with(DELIMITER) {
            prefix.push_str(DELIMITER);
        }
        Self {
            bucket: bucket.into(),
            prefix,
        }
    }
}

/// Raw result of a delimited (one-level) store listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// Objects directly at the listed level.
    pub items: Vec<ObjectEntry>,
    /// Common prefixes one level deeper, each ending in the delimiter.
    pub prefixes: Vec<String>,
}

/// Folders and files of one directory level, in store order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListingResult {
    pub files: Vec<ObjectEntry>,
    pub prefixes: Vec<PrefixGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_gets_trailing_delimiter() {
        let req = ListingRequest::new("bkt", "reports/2024");
        assert_eq!(req.prefix, "reports/2024/");
    }

    #[test]
    fn root_and_terminated_prefixes_are_kept() {
        assert_eq!(ListingRequest::new("bkt", "").prefix, "");
        assert_eq!(ListingRequest::new("bkt", "a/b/").prefix, "a/b/");
    }
}
