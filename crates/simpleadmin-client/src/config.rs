//! Client and execution configuration with TOML support

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AtClientError, Result};

/// Default number of retries after the first attempt
pub const DEFAULT_RETRIES: u32 = 2;
/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Default CGI path of the AT command executor
pub const DEFAULT_ENDPOINT: &str = "/cgi-bin/get_atcommand";
/// Default connection timeout for the HTTP transport
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-call execution options as supplied by a caller.
///
/// Every field is optional and validated leniently: a value that is out of
/// range falls back to its default instead of producing an error. Use
/// [`ExecOptions::resolve`] to obtain the effective values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Retries after the first attempt (must be >= 0)
    #[serde(default)]
    pub retries: Option<i64>,

    /// Per-attempt timeout in milliseconds (must be > 0)
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<f64>,

    /// Executor path, relative to the client's base URL
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retries(mut self, retries: i64) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn timeout_ms(mut self, ms: f64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Fill unset fields from `defaults`, keeping the ones set here.
    pub fn or(self, defaults: &ExecOptions) -> Self {
        Self {
            retries: self.retries.or(defaults.retries),
            timeout_ms: self.timeout_ms.or(defaults.timeout_ms),
            endpoint: self.endpoint.or_else(|| defaults.endpoint.clone()),
        }
    }

    /// Apply defaults to missing or invalid fields.
    pub fn resolve(&self) -> ResolvedOptions {
        let retries = self
            .retries
            .and_then(|r| u32::try_from(r).ok())
            .unwrap_or(DEFAULT_RETRIES);

        let timeout = self
            .timeout_ms
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
            .unwrap_or(DEFAULT_TIMEOUT);

        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string();

        ResolvedOptions {
            retries,
            timeout,
            endpoint,
        }
    }
}

/// Effective execution options after defaults have been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub retries: u32,
    pub timeout: Duration,
    pub endpoint: String,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        ExecOptions::default().resolve()
    }
}

/// Connection settings for [`HttpTransport`](crate::HttpTransport)
///
/// ```toml
/// base_url = "http://192.168.225.1"
/// connect_timeout_ms = 5000
///
/// [exec]
/// retries = 3
/// timeout_ms = 15000
/// endpoint = "/cgi-bin/get_atcommand"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the router web server
    pub base_url: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Default execution options for every call
    #[serde(default)]
    pub exec: ExecOptions,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout_ms: default_connect_timeout_ms(),
            exec: ExecOptions::default(),
        }
    }

    /// Load from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AtClientError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AtClientError::Config(e.to_string()))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
