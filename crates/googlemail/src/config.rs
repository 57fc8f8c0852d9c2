//! Configuration and credential loading
//!
//! Credential material arrives as raw JSON bytes in one of the formats
//! Google Cloud Console hands out:
//! 1. OAuth client secret (`installed` or `web` section) plus a token JSON
//! 2. Service account key (for domain-wide delegation)
//!
//! Client tuning lives in [`Settings`], read from `settings.json` in the
//! config directory when present.
//!
//! Problems found here are setup errors: callers get an `anyhow::Error`
//! describing what is wrong and should not continue.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings filename in the config directory
const SETTINGS_FILE: &str = "settings.json";

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const DEFAULT_DELEGATE_CONCURRENCY: NonZeroUsize = NonZeroUsize::new(10).unwrap();

/// Client tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Concurrent create/delete calls per delegate batch
    pub delegate_concurrency: NonZeroUsize,
    /// Concurrent `get message` calls per header fetch
    pub header_fetch_concurrency: NonZeroUsize,
    /// Global timeout for a single HTTP request
    pub request_timeout_secs: u64,
    /// Attempts for idempotent reads before giving up
    pub max_retries: u32,
    /// Whether searches cover spam and trash
    pub include_spam_trash: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delegate_concurrency: DEFAULT_DELEGATE_CONCURRENCY,
            header_fetch_concurrency: NonZeroUsize::MIN,
            request_timeout_secs: 30,
            max_retries: 3,
            include_spam_trash: true,
        }
    }
}

impl Settings {
    /// Load `settings.json` from the config directory, or defaults if absent
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            return config::load_json(SETTINGS_FILE);
        }
        Ok(Self::default())
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse settings from a JSON string; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Persist these settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// OAuth client credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    token_uri: Option<String>,
}

impl ClientSecret {
    /// Load `google-credentials.json` from the config directory
    pub fn load() -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse credentials from raw JSON bytes (Google Cloud Console format)
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_slice(json).context("Failed to parse client secret JSON")?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
            token_uri: installed
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Get the default credentials file path (~/.config/googlemail/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// A previously issued OAuth2 token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiry; `None` means unknown
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Parse a token from raw JSON bytes
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let token: Self = serde_json::from_slice(json).context("Failed to parse OAuth token JSON")?;
        if token.access_token.is_empty() && token.refresh_token.is_none() {
            anyhow::bail!("OAuth token has neither an access token nor a refresh token");
        }
        Ok(token)
    }
}

/// Service account key used for domain-wide delegation
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse a service account key from raw JSON bytes
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let key: Self =
            serde_json::from_slice(json).context("Failed to parse service account key JSON")?;
        if let Some(kind) = &key.key_type
            && kind != "service_account"
        {
            anyhow::bail!("Expected a service_account key, found '{}'", kind);
        }
        Ok(key)
    }

    /// Load a service account key from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = config::load_bytes_file(path)?;
        Self::from_json(&bytes)
    }
}
