//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Download job settings (output location, concurrency, collaborator format)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory finished files are written to (default: "./downloads_v2")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum number of jobs extracting at once (default: unbounded)
    ///
    /// Jobs over the limit stay `queued` until a slot frees up.
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,

    /// Collaborator format selector (default: "best")
    #[serde(default = "default_format")]
    pub format: String,

    /// How long shutdown waits for running jobs (default: 30 seconds)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    pub shutdown_grace: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_jobs: None,
            format: default_format(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// Direct-mode resolution settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectConfig {
    /// Deadline for a metadata-only resolution (default: 8 seconds)
    #[serde(default = "default_direct_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            timeout: default_direct_timeout(),
        }
    }
}

/// Output directory sweeping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Files older than this are removed by a sweep (default: 2 hours)
    #[serde(default = "default_retention", with = "duration_serde")]
    pub retention: Duration,

    /// Run a sweep periodically in the background (default: disabled)
    #[serde(default, with = "optional_duration_serde")]
    pub interval: Option<Duration>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            interval: None,
        }
    }
}

/// Accepted source URLs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Hosts (and their subdomains) a submitted URL must belong to
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            allowed_domains: default_allowed_domains(),
        }
    }
}

/// yt-dlp collaborator settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to the yt-dlp executable (searched on PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Extra arguments appended to every yt-dlp invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5001)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

/// Public tunnel settings
#[derive(Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Try to open a tunnel at startup (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Path to the ngrok executable (searched on PATH if None)
    #[serde(default)]
    pub ngrok_path: Option<PathBuf>,

    /// Tunnel auth token, read from `NGROK_AUTHTOKEN`; never serialized or logged
    #[serde(skip)]
    pub authtoken: Option<String>,

    /// Base URL of the ngrok local inspection API
    #[serde(default = "default_tunnel_api_url")]
    pub api_url: String,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ngrok_path: None,
            authtoken: None,
            api_url: default_tunnel_api_url(),
        }
    }
}

impl std::fmt::Debug for TunnelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelConfig")
            .field("enabled", &self.enabled)
            .field("ngrok_path", &self.ngrok_path)
            .field("authtoken", &self.authtoken.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Main configuration for MediaDownloader
///
/// Every field has a default, so `Config::default()` is a working setup that
/// matches the behavior of the original deployment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download job settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Direct-mode resolution settings
    #[serde(default)]
    pub direct: DirectConfig,

    /// Output directory sweeping
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Accepted source URLs
    #[serde(default)]
    pub sources: SourceConfig,

    /// yt-dlp collaborator settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// REST API settings
    #[serde(default)]
    pub server: ApiConfig,

    /// Public tunnel settings
    #[serde(default)]
    pub tunnel: TunnelConfig,
}

/// Environment variable names understood by [`Config::from_env`]
pub mod env_keys {
    /// API bind address (`host:port`)
    pub const BIND: &str = "MEDIA_DL_BIND";
    /// Output directory
    pub const OUTPUT_DIR: &str = "MEDIA_DL_OUTPUT_DIR";
    /// Direct-mode timeout in seconds
    pub const DIRECT_TIMEOUT_SECS: &str = "MEDIA_DL_DIRECT_TIMEOUT_SECS";
    /// Worker limit
    pub const MAX_CONCURRENT_JOBS: &str = "MEDIA_DL_MAX_CONCURRENT_JOBS";
    /// yt-dlp executable
    pub const YTDLP: &str = "MEDIA_DL_YTDLP";
    /// Enable the tunnel ("1"/"true")
    pub const TUNNEL: &str = "MEDIA_DL_TUNNEL";
    /// ngrok auth token
    pub const NGROK_AUTHTOKEN: &str = "NGROK_AUTHTOKEN";
    /// JSON log output ("1"), read by the server binary
    pub const LOG_JSON: &str = "MEDIA_DL_LOG_JSON";
}

impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup(key)` for each key in [`env_keys`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(bind) = lookup(env_keys::BIND) {
            config.server.bind_address = parse_env(env_keys::BIND, &bind)?;
        }
        if let Some(dir) = lookup(env_keys::OUTPUT_DIR) {
            config.download.output_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(env_keys::DIRECT_TIMEOUT_SECS) {
            config.direct.timeout =
                Duration::from_secs(parse_env(env_keys::DIRECT_TIMEOUT_SECS, &secs)?);
        }
        if let Some(limit) = lookup(env_keys::MAX_CONCURRENT_JOBS) {
            config.download.max_concurrent_jobs =
                Some(parse_env(env_keys::MAX_CONCURRENT_JOBS, &limit)?);
        }
        if let Some(path) = lookup(env_keys::YTDLP) {
            config.extractor.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = lookup(env_keys::TUNNEL) {
            config.tunnel.enabled = matches!(flag.trim(), "1" | "true" | "yes" | "on");
        }
        config.tunnel.authtoken = lookup(env_keys::NGROK_AUTHTOKEN).filter(|t| !t.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the downloader cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.direct.timeout.is_zero() {
            return Err(config_error("direct timeout must be non-zero", "direct.timeout"));
        }
        if self.cleanup.retention.is_zero() {
            return Err(config_error(
                "cleanup retention must be non-zero",
                "cleanup.retention",
            ));
        }
        if self.download.max_concurrent_jobs == Some(0) {
            return Err(config_error(
                "max_concurrent_jobs must be at least 1",
                "download.max_concurrent_jobs",
            ));
        }
        if self.sources.allowed_domains.is_empty() {
            return Err(config_error(
                "at least one allowed source domain is required",
                "sources.allowed_domains",
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| Error::Config {
        message: format!("invalid value for {key}: {e}"),
        key: Some(key.to_string()),
    })
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads_v2")
}

fn default_format() -> String {
    "best".to_string()
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_direct_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_retention() -> Duration {
    Duration::from_secs(2 * 60 * 60)
}

fn default_allowed_domains() -> Vec<String> {
    vec!["xiaohongshu.com".to_string(), "xhslink.com".to_string()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5001))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_tunnel_api_url() -> String {
    "http://127.0.0.1:4040".to_string()
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
