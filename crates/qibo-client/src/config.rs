//! Client configuration.
//!
//! Supports loading configuration from:
//! 1. Environment variables
//! 2. `.env` files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Values set on the struct before [`ClientConfig::merge_env`]
//! 3. Default values
//!
//! The configuration is read once and handed to [`Client`](crate::Client) and
//! [`QiboJob`](crate::QiboJob) by value; nothing is kept in process globals.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Circuit-library version this client produces circuits for.
pub const QIBO_VERSION: &str = "0.2.8";

/// Default QRC cluster login node.
pub const DEFAULT_HOST: &str = "login.qrccluster.com";

/// Default QRC cluster port.
pub const DEFAULT_PORT: u16 = 8010;

/// Default number of seconds between two result checks.
pub const DEFAULT_SECONDS_BETWEEN_CHECKS: u64 = 2;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for talking to the QRC cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Cluster host name or IP (`QRCCLUSTER_IP`).
    #[serde(default = "default_host")]
    pub host: String,

    /// Cluster port (`QRCCLUSTER_PORT`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Full endpoint root, overriding `host`/`port` (`QIBO_CLIENT_URL`).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Directory under which one folder per job is created (`RESULTS_BASE_FOLDER`).
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,

    /// Poll interval while waiting for results (`SECONDS_BETWEEN_CHECKS`).
    #[serde(default = "default_seconds_between_checks")]
    pub seconds_between_checks: u64,

    /// Timeout applied to every request (`QIBO_CLIENT_TIMEOUT`).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Circuit-library version expected on the server (`QIBO_VERSION`).
    #[serde(default = "default_qibo_version")]
    pub qibo_version: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_results_root() -> PathBuf {
    std::env::temp_dir().join("qibo_client")
}

fn default_seconds_between_checks() -> u64 {
    DEFAULT_SECONDS_BETWEEN_CHECKS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_qibo_version() -> String {
    QIBO_VERSION.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            results_root: default_results_root(),
            seconds_between_checks: default_seconds_between_checks(),
            request_timeout_secs: default_timeout(),
            qibo_version: default_qibo_version(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at an explicit endpoint root (useful for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> ClientResult<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables that are set override the current values; unparsable
    /// numbers are ignored.
    pub fn merge_env(mut self) -> Self {
        if let Ok(v) = std::env::var("QRCCLUSTER_IP") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("QRCCLUSTER_PORT") {
            if let Ok(val) = v.parse() {
                self.port = val;
            }
        }
        if let Ok(v) = std::env::var("QIBO_CLIENT_URL") {
            self.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("RESULTS_BASE_FOLDER") {
            self.results_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SECONDS_BETWEEN_CHECKS") {
            if let Ok(val) = v.parse() {
                self.seconds_between_checks = val;
            }
        }
        if let Ok(v) = std::env::var("QIBO_CLIENT_TIMEOUT") {
            if let Ok(val) = v.parse() {
                self.request_timeout_secs = val;
            }
        }
        if let Ok(v) = std::env::var("QIBO_VERSION") {
            self.qibo_version = v;
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url().is_empty() {
            return Err(ClientError::Configuration("base URL is empty".into()));
        }
        if self.seconds_between_checks == 0 {
            return Err(ClientError::Configuration(
                "seconds_between_checks must be positive".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Endpoint root without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.seconds_between_checks)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
