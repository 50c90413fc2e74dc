use anyhow::{Context, Result};
use clap::Parser;
use std::{env, time::Duration};

const DEFAULT_API_URL: &str = "https://storage.googleapis.com";
const DEFAULT_TOKEN_COMMAND: &str = "gcloud config config-helper --format=json";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the Cloud Storage JSON API (overridable for emulators).
    pub api_url: String,
    /// Shell command printing `gcloud config config-helper` JSON.
    pub token_command: String,
    pub request_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cloud Storage browser API for notebook frontends")]
pub struct Args {
    /// Host to bind to (overrides GCS_BRIDGE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GCS_BRIDGE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Cloud Storage API base URL (overrides GCS_BRIDGE_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Command that prints the credential bundle (overrides GCS_BRIDGE_TOKEN_COMMAND)
    #[arg(long)]
    pub token_command: Option<String>,

    /// Per-request timeout against Cloud Storage, in seconds
    /// (overrides GCS_BRIDGE_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GCS_BRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("GCS_BRIDGE_PORT", 8889u16)?;
        let env_api_url = env::var("GCS_BRIDGE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let env_token_command =
            env::var("GCS_BRIDGE_TOKEN_COMMAND").unwrap_or_else(|_| DEFAULT_TOKEN_COMMAND.into());
        let env_timeout = parse_env("GCS_BRIDGE_REQUEST_TIMEOUT_SECS", 60u64)?;

        // --- Merge ---
        let api_url = args.api_url.unwrap_or(env_api_url);
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            api_url: api_url.trim_end_matches('/').to_string(),
            token_command: args.token_command.unwrap_or(env_token_command),
            request_timeout: Duration::from_secs(args.request_timeout_secs.unwrap_or(env_timeout)),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
