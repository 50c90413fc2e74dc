//! Hierarchical listing reconciler.
//!
//! Cloud Storage has no folders: a delimited listing returns the objects of
//! one level plus the common prefixes below it, and prefixes carry no
//! metadata. To show a "last updated" time per folder, a second recursive
//! listing of the same prefix is scanned once and grouped by first path
//! segment.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::{
    models::{
        listing::{DELIMITER, ListingRequest, ListingResult},
        object::ObjectStamp,
        prefix::PrefixGroup,
    },
    services::object_store::{ObjectStore, StorageResult},
};

/// List one directory level, annotating each folder with the newest
/// modification time found beneath it.
///
/// Makes one store call when the level has no sub-folders and exactly two
/// otherwise. A failure of either call fails the whole listing; folders are
/// never returned with silently missing timestamps.
pub async fn reconcile(
    store: &dyn ObjectStore,
    request: &ListingRequest,
) -> StorageResult<ListingResult> {
    let shallow = store
        .list_shallow(&request.bucket, &request.prefix, DELIMITER)
        .await?;

    let latest = if shallow.prefixes.is_empty() {
        HashMap::new()
    } else {
        let deep = store.list_deep(&request.bucket, &request.prefix).await?;
        latest_updates(&request.prefix, &shallow.prefixes, &deep)
    };

    debug!(
        bucket = %request.bucket,
        prefix = %request.prefix,
        files = shallow.items.len(),
        folders = shallow.prefixes.len(),
        "reconciled listing"
    );

    let prefixes = shallow
        .prefixes
        .into_iter()
        .map(|name| {
            let latest_updated_at = latest.get(&name).copied();
            PrefixGroup {
                name,
                latest_updated_at,
            }
        })
        .collect();

    Ok(ListingResult {
        files: shallow.items,
        prefixes,
    })
}

/// Newest `updated_at` per common prefix, from a single pass over the
/// recursive listing. Objects without a timestamp, objects directly at
/// `prefix` and objects under prefixes not in `common` are ignored.
fn latest_updates(
    prefix: &str,
    common: &[String],
    deep: &[ObjectStamp],
) -> HashMap<String, DateTime<Utc>> {
    let known: HashSet<&str> = common.iter().map(String::as_str).collect();
    let mut latest: HashMap<String, DateTime<Utc>> = HashMap::new();

    for stamp in deep {
        let Some(updated) = stamp.updated_at else {
            continue;
        };
        let Some(relative) = stamp.name.strip_prefix(prefix) else {
            continue;
        };
        let Some((first, _)) = relative.split_once(DELIMITER) else {
            continue;
        };

        let candidate = format!("{prefix}{first}{DELIMITER}");
        if !known.contains(candidate.as_str()) {
            continue;
        }
        latest
            .entry(candidate)
            .and_modify(|best| {
                if updated > *best {
                    *best = updated;
                }
            })
            .or_insert(updated);
    }

    latest
}
