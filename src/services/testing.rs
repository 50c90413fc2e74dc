//! In-memory [`ObjectStore`] for tests.
//!
//! Holds a single bucket (`bkt`) whose objects keep insertion order, groups
//! delimited listings the way Cloud Storage does, records every call by name
//! and can be told to fail a given call.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{collections::HashSet, sync::Mutex};

use crate::{
    models::{
        bucket::BucketEntry,
        listing::ObjectListing,
        object::{ObjectEntry, ObjectStamp},
    },
    services::object_store::{ObjectStore, StorageError, StorageResult},
};

pub const BUCKET: &str = "bkt";

pub fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("valid RFC 3339 timestamp")
}

pub fn entry(name: &str, updated: Option<&str>) -> ObjectEntry {
    let is_folder = name.ends_with('/');
    ObjectEntry {
        name: name.into(),
        created_at: updated.map(ts),
        updated_at: updated.map(ts),
        size: if is_folder { 0 } else { 10 },
        content_type: if is_folder { String::new() } else { "text/plain".into() },
    }
}

struct StoredObject {
    entry: ObjectEntry,
    content: Bytes,
}

pub struct FakeStore {
    objects: Mutex<Vec<StoredObject>>,
    calls: Mutex<Vec<&'static str>>,
    failure: Option<(&'static str, fn() -> StorageError)>,
}

fn unavailable() -> StorageError {
    StorageError::Api {
        status: 503,
        message: "injected failure".into(),
    }
}

impl FakeStore {
    pub fn new(entries: Vec<ObjectEntry>) -> Self {
        let objects = entries
            .into_iter()
            .map(|entry| StoredObject {
                content: Bytes::from(vec![b'x'; entry.size as usize]),
                entry,
            })
            .collect();
        Self {
            objects: Mutex::new(objects),
            calls: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Make `call` fail with a 503 API error.
    pub fn failing_on(self, call: &'static str) -> Self {
        self.failing_with(call, unavailable)
    }

    pub fn failing_with(mut self, call: &'static str, error: fn() -> StorageError) -> Self {
        self.failure = Some((call, error));
        self
    }

    pub fn with_content(self, name: &str, content: &[u8]) -> Self {
        {
            let mut objects = self.objects.lock().unwrap();
            objects.retain(|o| o.entry.name != name);
            let mut entry = entry(name, Some("2024-01-01T00:00:00Z"));
            entry.size = content.len() as u64;
            objects.push(StoredObject {
                entry,
                content: Bytes::copy_from_slice(content),
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.entry.name.clone())
            .collect()
    }

    fn record(&self, call: &'static str, bucket: &str) -> StorageResult<()> {
        self.calls.lock().unwrap().push(call);
        if let Some((failing, error)) = self.failure {
            if failing == call {
                return Err(error());
            }
        }
        if bucket != BUCKET {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        Ok(())
    }

    fn put(&self, name: &str, content: Bytes, content_type: &str) -> ObjectEntry {
        let now = ts("2024-06-01T00:00:00Z");
        let entry = ObjectEntry {
            name: name.into(),
            created_at: Some(now),
            updated_at: Some(now),
            size: content.len() as u64,
            content_type: content_type.into(),
        };
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|o| o.entry.name != name);
        objects.push(StoredObject {
            entry: entry.clone(),
            content,
        });
        entry
    }
}

/// Common prefix one delimiter below `prefix`, if `key` is nested that deep.
fn common_prefix(key: &str, prefix: &str, delimiter: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?;
    let pos = rest.find(delimiter)?;
    Some(format!("{}{}", prefix, &rest[..pos + delimiter.len()]))
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_buckets(&self, prefix: Option<&str>) -> StorageResult<Vec<BucketEntry>> {
        self.record("list_buckets", BUCKET)?;
        Ok(std::iter::once(BUCKET)
            .filter(|name| prefix.is_none_or(|p| name.starts_with(p)))
            .map(|name| BucketEntry {
                name: name.into(),
                updated_at: Some(ts("2023-01-01T12:00:00Z")),
            })
            .collect())
    }

    async fn list_shallow(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> StorageResult<ObjectListing> {
        self.record("list_shallow", bucket)?;
        let objects = self.objects.lock().unwrap();
        let mut listing = ObjectListing::default();
        let mut seen = HashSet::new();
        for obj in objects.iter().filter(|o| o.entry.name.starts_with(prefix)) {
            match common_prefix(&obj.entry.name, prefix, delimiter) {
                Some(p) => {
                    if seen.insert(p.clone()) {
                        listing.prefixes.push(p);
                    }
                }
                None => listing.items.push(obj.entry.clone()),
            }
        }
        Ok(listing)
    }

    async fn list_deep(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectStamp>> {
        self.record("list_deep", bucket)?;
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|o| o.entry.name.starts_with(prefix))
            .map(|o| ObjectStamp::from(&o.entry))
            .collect())
    }

    async fn object_exists(&self, bucket: &str, name: &str) -> StorageResult<bool> {
        self.record("object_exists", bucket)?;
        Ok(self.names().iter().any(|n| n == name))
    }

    async fn create_folder(&self, bucket: &str, name: &str) -> StorageResult<ObjectEntry> {
        self.record("create_folder", bucket)?;
        Ok(self.put(name, Bytes::new(), "text/plain"))
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> StorageResult<()> {
        self.record("delete_object", bucket)?;
        let mut objects = self.objects.lock().unwrap();
        let before = objects.len();
        objects.retain(|o| o.entry.name != name);
        if objects.len() == before {
            return Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn rename_object(
        &self,
        bucket: &str,
        from: &str,
        to: &str,
    ) -> StorageResult<ObjectEntry> {
        self.record("rename_object", bucket)?;
        let mut objects = self.objects.lock().unwrap();
        let obj = objects
            .iter_mut()
            .find(|o| o.entry.name == from)
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: from.to_string(),
            })?;
        obj.entry.name = to.to_string();
        Ok(obj.entry.clone())
    }

    async fn save_content(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        content_type: &str,
    ) -> StorageResult<ObjectEntry> {
        self.record("save_content", bucket)?;
        Ok(self.put(name, content, content_type))
    }

    async fn download_object(&self, bucket: &str, name: &str) -> StorageResult<Bytes> {
        self.record("download_object", bucket)?;
        let objects = self.objects.lock().unwrap();
        objects
            .iter()
            .find(|o| o.entry.name == name)
            .map(|o| o.content.clone())
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }
}
