//! Cloud Storage JSON API adapter.
//!
//! Implements [`ObjectStore`] with plain REST calls. Every call fetches a
//! bundle from the credential broker and sends its access token as a bearer
//! token; listings follow `nextPageToken` until exhausted.

use anyhow::{Context, bail};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url, header};
use serde::{Deserialize, de::DeserializeOwned};
use std::collections::HashSet;
use tracing::debug;

use crate::{
    models::{
        bucket::BucketEntry,
        listing::ObjectListing,
        object::{ObjectEntry, ObjectStamp},
    },
    services::{
        credentials::CredentialProvider,
        object_store::{ObjectStore, StorageError, StorageResult},
    },
};

const SHALLOW_FIELDS: &str =
    "items(name,size,contentType,timeCreated,updated),prefixes,nextPageToken";
const DEEP_FIELDS: &str = "items(name,updated),nextPageToken";
const BUCKET_FIELDS: &str = "items(name,updated),nextPageToken";
const FOLDER_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    #[serde(default)]
    prefixes: Vec<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    /// The API reports sizes as decimal strings.
    size: Option<String>,
    content_type: Option<String>,
    time_created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
}

impl From<ObjectResource> for ObjectEntry {
    fn from(res: ObjectResource) -> Self {
        Self {
            size: res
                .size
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            content_type: res.content_type.unwrap_or_default(),
            created_at: res.time_created,
            updated_at: res.updated,
            name: res.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketList {
    #[serde(default)]
    items: Vec<BucketResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BucketResource {
    name: String,
    updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewriteResponse {
    done: bool,
    rewrite_token: Option<String>,
    resource: Option<ObjectResource>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the human-readable message out of an API error body, falling back
/// to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Turn a non-2xx response into a [`StorageError`]. `not_found` decides what
/// a 404 means for the call at hand.
async fn check(
    res: Response,
    not_found: impl FnOnce() -> StorageError,
) -> StorageResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    let message = error_message(&body);
    debug!("Cloud Storage call failed ({}): {}", status, message);
    Err(match status {
        StatusCode::UNAUTHORIZED => StorageError::Unauthorized(message),
        StatusCode::FORBIDDEN => StorageError::PermissionDenied(message),
        StatusCode::NOT_FOUND => not_found(),
        other => StorageError::Api {
            status: other.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(res: Response) -> StorageResult<T> {
    res.json::<T>()
        .await
        .map_err(|err| StorageError::InvalidResponse(err.to_string()))
}

/// Cloud Storage backed [`ObjectStore`].
#[derive(Clone, Debug)]
pub struct GcsStore {
    http: Client,
    base: Url,
    credentials: CredentialProvider,
}

impl GcsStore {
    /// `api_url` is the API root, e.g. `https://storage.googleapis.com`.
    pub fn new(
        http: Client,
        api_url: &str,
        credentials: CredentialProvider,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(api_url).with_context(|| format!("parsing API URL `{}`", api_url))?;
        if base.cannot_be_a_base() {
            bail!("API URL `{}` cannot carry a path", api_url);
        }
        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    /// Build an API URL from raw path segments. Each segment is
    /// percent-encoded on its own, so object names keep their `/`.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn object_url(&self, bucket: &str, name: &str) -> Url {
        self.endpoint(&["storage", "v1", "b", bucket, "o", name])
    }

    async fn authorized(&self, method: Method, url: Url) -> StorageResult<RequestBuilder> {
        let creds = self.credentials.get().await?;
        debug!("{} {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&creds.access_token))
    }

    async fn object_metadata(&self, bucket: &str, name: &str) -> StorageResult<ObjectEntry> {
        let mut url = self.object_url(bucket, name);
        url.query_pairs_mut()
            .append_pair("fields", "name,size,contentType,timeCreated,updated");

        let res = self.authorized(Method::GET, url).await?.send().await?;
        let res = check(res, || StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            name: name.to_string(),
        })
        .await?;
        let resource: ObjectResource = decode(res).await?;
        Ok(resource.into())
    }

    async fn list_pages(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        fields: &str,
    ) -> StorageResult<ObjectList> {
        let mut listing = ObjectList::default();
        let mut seen_prefixes = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["storage", "v1", "b", bucket, "o"]);
            {
                let mut qp = url.query_pairs_mut();
                if let Some(delimiter) = delimiter {
                    qp.append_pair("delimiter", delimiter);
                }
                if !prefix.is_empty() {
                    qp.append_pair("prefix", prefix);
                }
                qp.append_pair("fields", fields);
                if let Some(ref token) = page_token {
                    qp.append_pair("pageToken", token);
                }
            }

            let res = self.authorized(Method::GET, url).await?.send().await?;
            let res = check(res, || StorageError::BucketNotFound(bucket.to_string())).await?;
            let page: ObjectList = decode(res).await?;

            listing.items.extend(page.items);
            for p in page.prefixes {
                if seen_prefixes.insert(p.clone()) {
                    listing.prefixes.push(p);
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(listing)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list_buckets(&self, prefix: Option<&str>) -> StorageResult<Vec<BucketEntry>> {
        let project = self.credentials.get().await?.project_id;
        let mut buckets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["storage", "v1", "b"]);
            {
                let mut qp = url.query_pairs_mut();
                qp.append_pair("project", &project);
                if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                    qp.append_pair("prefix", prefix);
                }
                qp.append_pair("fields", BUCKET_FIELDS);
                if let Some(ref token) = page_token {
                    qp.append_pair("pageToken", token);
                }
            }

            let res = self.authorized(Method::GET, url).await?.send().await?;
            let res = check(res, || StorageError::Api {
                status: 404,
                message: format!("project `{}` not found", project),
            })
            .await?;
            let page: BucketList = decode(res).await?;

            buckets.extend(page.items.into_iter().map(|b| BucketEntry {
                name: b.name,
                updated_at: b.updated,
            }));

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(buckets)
    }

    async fn list_shallow(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> StorageResult<ObjectListing> {
        let listing = self
            .list_pages(bucket, prefix, Some(delimiter), SHALLOW_FIELDS)
            .await?;
        Ok(ObjectListing {
            items: listing.items.into_iter().map(ObjectEntry::from).collect(),
            prefixes: listing.prefixes,
        })
    }

    async fn list_deep(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectStamp>> {
        let listing = self.list_pages(bucket, prefix, None, DEEP_FIELDS).await?;
        Ok(listing
            .items
            .into_iter()
            .map(|it| ObjectStamp {
                name: it.name,
                updated_at: it.updated,
            })
            .collect())
    }

    async fn object_exists(&self, bucket: &str, name: &str) -> StorageResult<bool> {
        let mut url = self.object_url(bucket, name);
        url.query_pairs_mut().append_pair("fields", "name");

        let res = self.authorized(Method::GET, url).await?.send().await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(res, || StorageError::BucketNotFound(bucket.to_string())).await?;
        Ok(true)
    }

    async fn create_folder(&self, bucket: &str, name: &str) -> StorageResult<ObjectEntry> {
        self.save_content(bucket, name, Bytes::new(), FOLDER_CONTENT_TYPE)
            .await
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> StorageResult<()> {
        let url = self.object_url(bucket, name);
        let res = self.authorized(Method::DELETE, url).await?.send().await?;
        check(res, || StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            name: name.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn rename_object(
        &self,
        bucket: &str,
        from: &str,
        to: &str,
    ) -> StorageResult<ObjectEntry> {
        if from == to {
            // a rewrite onto itself followed by the delete would drop the object
            return self.object_metadata(bucket, from).await;
        }

        // Cloud Storage has no rename: rewrite to the new name, then delete.
        let mut rewrite_token: Option<String> = None;
        let resource = loop {
            let mut url =
                self.endpoint(&["storage", "v1", "b", bucket, "o", from, "rewriteTo", "b", bucket, "o", to]);
            if let Some(ref token) = rewrite_token {
                url.query_pairs_mut().append_pair("rewriteToken", token);
            }

            let res = self
                .authorized(Method::POST, url)
                .await?
                .json(&serde_json::Map::new())
                .send()
                .await?;
            let res = check(res, || StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                name: from.to_string(),
            })
            .await?;
            let step: RewriteResponse = decode(res).await?;

            if step.done {
                break step.resource.ok_or_else(|| {
                    StorageError::InvalidResponse("rewrite finished without a resource".into())
                })?;
            }
            rewrite_token = step.rewrite_token;
            if rewrite_token.is_none() {
                return Err(StorageError::InvalidResponse(
                    "unfinished rewrite returned no token".into(),
                ));
            }
        };

        self.delete_object(bucket, from).await?;
        Ok(resource.into())
    }

    async fn save_content(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        content_type: &str,
    ) -> StorageResult<ObjectEntry> {
        let mut url = self.endpoint(&["upload", "storage", "v1", "b", bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", name);

        let res = self
            .authorized(Method::POST, url)
            .await?
            .header(header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;
        let res = check(res, || StorageError::BucketNotFound(bucket.to_string())).await?;
        let resource: ObjectResource = decode(res).await?;
        Ok(resource.into())
    }

    async fn download_object(&self, bucket: &str, name: &str) -> StorageResult<Bytes> {
        let mut url = self.object_url(bucket, name);
        url.query_pairs_mut().append_pair("alt", "media");

        let res = self.authorized(Method::GET, url).await?.send().await?;
        let res = check(res, || StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            name: name.to_string(),
        })
        .await?;
        Ok(res.bytes().await?)
    }
}
