use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cloud: Cloud,
    #[serde(default)]
    pub endpoints: EndpointOverrides,
    pub credentials: CredentialsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub streams: Vec<StreamConfig>,
}

impl Config {
    pub fn authority(&self) -> &str {
        self.endpoints
            .authority
            .as_deref()
            .unwrap_or_else(|| self.cloud.authority())
    }

    /// Feed host root, also the resource feed tokens are scoped to.
    pub fn feed_endpoint(&self) -> &str {
        self.endpoints
            .feed
            .as_deref()
            .unwrap_or_else(|| self.cloud.feed_endpoint())
    }

    /// Versioned API root the stream paths hang off.
    pub fn feed_api_root(&self) -> String {
        format!(
            "{}/{}",
            self.feed_endpoint().trim_end_matches('/'),
            self.feed.api_version.trim_matches('/')
        )
    }

    pub fn storage_suffix(&self) -> &str {
        self.endpoints
            .storage_suffix
            .as_deref()
            .unwrap_or_else(|| self.cloud.storage_suffix())
    }
}

/// Sovereign cloud whose endpoints are used by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    #[default]
    Public,
    #[serde(rename = "usgov")]
    UsGov,
}

impl Cloud {
    pub fn authority(&self) -> &'static str {
        match self {
            Cloud::Public => "https://login.microsoftonline.com/",
            Cloud::UsGov => "https://login.microsoftonline.us/",
        }
    }

    pub fn feed_endpoint(&self) -> &'static str {
        match self {
            Cloud::Public => "https://graph.microsoft.com/",
            Cloud::UsGov => "https://graph.microsoft.us/",
        }
    }

    pub fn storage_suffix(&self) -> &'static str {
        match self {
            Cloud::Public => "core.windows.net",
            Cloud::UsGov => "core.usgovcloudapi.net",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointOverrides {
    pub authority: Option<String>,
    pub feed: Option<String>,
    pub storage_suffix: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Azure {
        account: String,
        #[serde(default = "default_storage_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
    Filesystem {
        path: PathBuf,
    },
}

fn default_storage_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_feed_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            page_size: default_page_size(),
            timeout: default_feed_timeout(),
        }
    }
}

fn default_api_version() -> String {
    "beta".to_string()
}

fn default_page_size() -> u32 {
    500
}

fn default_feed_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How far back a stream without a checkpoint starts.
    #[serde(default = "default_lookback", with = "humantime_serde")]
    pub lookback: Duration,
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            artifact_prefix: default_artifact_prefix(),
            content_type: default_content_type(),
        }
    }
}

fn default_lookback() -> Duration {
    Duration::from_secs(90 * 24 * 3600)
}

fn default_artifact_prefix() -> String {
    "logs".to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Upper bound on throttled attempts per request; unset retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub jitter: Duration,
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval: default_retry_interval(),
            max_attempts: None,
            jitter: Duration::ZERO,
            transient_retries: default_transient_retries(),
        }
    }
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_transient_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub id: String,
    pub destination: String,
    /// Required for streams without a built-in cursor field.
    #[serde(default)]
    pub cursor_field: Option<String>,
    /// Feed path under the API root; defaults to `auditLogs/{id}`.
    #[serde(default)]
    pub path: Option<String>,
}
