//! Configuration loading from environment.
//!
//! All settings have defaults so the client runs against a local backend
//! without any setup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::error::{NyayaError, Result};

/// Backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Model requested from the legal chatbot endpoint.
pub const DEFAULT_CHATBOT_MODEL: &str = "llama-3.1-8b-instant";

/// Main configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash.
    pub api_url: String,
    /// File holding the persisted session.
    pub session_path: PathBuf,
    /// Per-request timeout.
    pub http_timeout: Duration,
    /// Model name sent to the legal chatbot.
    pub chatbot_model: String,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `NYAYASATHI_API_URL`: backend base URL (default: `http://localhost:8000`)
    /// - `NYAYASATHI_SESSION_PATH`: session file (default: `<config dir>/session.json`)
    /// - `NYAYASATHI_HTTP_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `NYAYASATHI_CHATBOT_MODEL`: chatbot model (default: `llama-3.1-8b-instant`)
    pub fn from_env() -> Result<Self> {
        let api_url = match env::var("NYAYASATHI_API_URL") {
            Ok(url) => normalize_api_url(&url)?,
            Err(_) => DEFAULT_API_URL.to_string(),
        };

        let session_path = match env::var("NYAYASATHI_SESSION_PATH") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_session_path()?,
        };

        let http_timeout = env::var("NYAYASATHI_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let chatbot_model = env::var("NYAYASATHI_CHATBOT_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHATBOT_MODEL.to_string());

        Ok(Self {
            api_url,
            session_path,
            http_timeout,
            chatbot_model,
        })
    }

    /// Configuration pointing at `api_url` with everything else defaulted.
    pub fn for_backend(api_url: &str, session_path: PathBuf) -> Result<Self> {
        Ok(Self {
            api_url: normalize_api_url(api_url)?,
            session_path,
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chatbot_model: DEFAULT_CHATBOT_MODEL.to_string(),
        })
    }

    /// Override the backend URL.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        self.api_url = normalize_api_url(api_url)?;
        Ok(self)
    }

    /// Override the session file.
    pub fn with_session_path(mut self, path: PathBuf) -> Self {
        self.session_path = path;
        self
    }
}

/// Validate a base URL and strip trailing slashes.
fn normalize_api_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(NyayaError::Config(format!(
            "API URL must start with http:// or https://: {}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn default_session_path() -> Result<PathBuf> {
    ProjectDirs::from("org", "nyayasathi", "nyayasathi")
        .map(|dirs| dirs.config_dir().join("session.json"))
        .ok_or_else(|| NyayaError::Config("could not determine a config directory".to_string()))
}
