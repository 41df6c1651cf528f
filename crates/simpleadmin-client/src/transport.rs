//! Transport seam between the AT client and the CGI executor

use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{AtClientError, Result};

/// Raw reply from one round trip to the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Shorthand for a `200` reply
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure of one round trip
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Carries one AT command to the executor and returns its raw reply.
///
/// Implementations must not apply their own retry policy; the client
/// cancels a pending `send` by dropping its future when the per-attempt
/// timeout fires.
#[async_trait]
pub trait AtTransport: Send + Sync {
    async fn send(&self, endpoint: &str, command: &str)
        -> std::result::Result<HttpReply, TransportError>;
}

#[async_trait]
impl<T: AtTransport + ?Sized> AtTransport for std::sync::Arc<T> {
    async fn send(
        &self,
        endpoint: &str,
        command: &str,
    ) -> std::result::Result<HttpReply, TransportError> {
        (**self).send(endpoint, command).await
    }
}

/// HTTP transport issuing `GET {base_url}{endpoint}?atcmd=<command>`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for the given router base URL
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the router web server (e.g., "http://192.168.225.1")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(&ClientConfig::new(base_url))
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| AtClientError::Transport(e.to_string()))?;

        let base_url = Url::parse(&config.base_url)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the request URL for one command
    pub fn command_url(&self, endpoint: &str, command: &str) -> Result<Url> {
        let mut url = self.base_url.join(endpoint)?;
        url.query_pairs_mut().clear().append_pair("atcmd", command);
        Ok(url)
    }
}

#[async_trait]
impl AtTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        command: &str,
    ) -> std::result::Result<HttpReply, TransportError> {
        let url = self
            .command_url(endpoint, command)
            .map_err(|e| TransportError::new(e.to_string()))?;
        trace!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            return Ok(HttpReply::new(status, String::new()));
        }

        let body = response.text().await?;
        Ok(HttpReply::new(status, body))
    }
}
