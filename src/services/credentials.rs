//! Credential broker.
//!
//! Runs an external token command (by default `gcloud config config-helper
//! --format=json`), validates the resulting bundle and caches it until shortly
//! before the access token expires. Every store call asks the broker for a
//! bundle, so a renewed token is picked up on the next request.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::{process::Command, sync::RwLock};
use tracing::{debug, warn};

/// Tokens are refreshed this long before their reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Validated credential bundle forwarded to the object store.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub project_id: String,
    pub region_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("region_id", &self.region_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("missing required credential `{0}`")]
    Missing(&'static str),
    #[error("failed to run token command: {0}")]
    Spawn(#[from] io::Error),
    #[error("token command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error("token command printed invalid output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

impl Credentials {
    /// Build a bundle, rejecting any absent or empty field.
    pub fn from_parts(
        access_token: Option<String>,
        project_id: Option<String>,
        region_id: Option<String>,
    ) -> Result<Self, CredentialsError> {
        Ok(Self {
            access_token: required(access_token, "access_token")?,
            project_id: required(project_id, "project_id")?,
            region_id: required(region_id, "region_id")?,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CredentialsError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(CredentialsError::Missing(field))
}

/// Subset of `gcloud config config-helper --format=json` output.
#[derive(Debug, Default, Deserialize)]
struct ConfigHelperOutput {
    #[serde(default)]
    configuration: Configuration,
    #[serde(default)]
    credential: CredentialSection,
}

#[derive(Debug, Default, Deserialize)]
struct Configuration {
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    core: CoreProperties,
    #[serde(default)]
    compute: ComputeProperties,
}

#[derive(Debug, Default, Deserialize)]
struct CoreProperties {
    project: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ComputeProperties {
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialSection {
    access_token: Option<String>,
    token_expiry: Option<DateTime<Utc>>,
}

/// Parse config-helper JSON into a bundle and its expiry.
fn parse_config_helper(
    raw: &[u8],
) -> Result<(Credentials, Option<DateTime<Utc>>), CredentialsError> {
    let out: ConfigHelperOutput = serde_json::from_slice(raw)?;
    let creds = Credentials::from_parts(
        out.credential.access_token,
        out.configuration.properties.core.project,
        out.configuration.properties.compute.region,
    )?;
    Ok((creds, out.credential.token_expiry))
}

#[derive(Debug)]
enum Source {
    Command(String),
    Fixed(Credentials),
}

#[derive(Debug, Clone)]
struct CachedCredentials {
    credentials: Credentials,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedCredentials {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now + Duration::seconds(EXPIRY_MARGIN_SECS) < expiry,
            None => true,
        }
    }
}

#[derive(Debug)]
struct Inner {
    source: Source,
    cache: RwLock<Option<CachedCredentials>>,
}

/// Shared handle to the credential source. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CredentialProvider {
    inner: Arc<Inner>,
}

impl CredentialProvider {
    /// Credentials obtained by running `command` through `sh -c`.
    pub fn from_command(command: impl Into<String>) -> Self {
        Self::with_source(Source::Command(command.into()))
    }

    /// A fixed bundle that never expires.
    pub fn fixed(credentials: Credentials) -> Self {
        Self::with_source(Source::Fixed(credentials))
    }

    fn with_source(source: Source) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cache: RwLock::new(None),
            }),
        }
    }

    /// Return a valid bundle, running the token command if the cached one
    /// is missing or about to expire.
    pub async fn get(&self) -> Result<Credentials, CredentialsError> {
        let command = match &self.inner.source {
            Source::Fixed(creds) => return Ok(creds.clone()),
            Source::Command(command) => command,
        };

        if let Some(cached) = self.inner.cache.read().await.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.credentials.clone());
            }
        }

        let mut cache = self.inner.cache.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.credentials.clone());
            }
        }

        let (credentials, expires_at) = run_token_command(command).await?;
        debug!(
            project = %credentials.project_id,
            region = %credentials.region_id,
            ?expires_at,
            "refreshed credentials"
        );
        *cache = Some(CachedCredentials {
            credentials: credentials.clone(),
            expires_at,
        });
        Ok(credentials)
    }
}

async fn run_token_command(
    command: &str,
) -> Result<(Credentials, Option<DateTime<Utc>>), CredentialsError> {
    // a cancelled request must not leave the helper running
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output()
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!("token command `{}` failed: {}", command, stderr);
        return Err(CredentialsError::CommandFailed {
            status: output.status.to_string(),
            stderr,
        });
    }
    parse_config_helper(&output.stdout)
}
