//! Test utilities for simpleadmin-client
//!
//! Provides an in-memory scripted transport for unit tests and a scripted
//! CGI executor served over real HTTP for integration tests.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::config::{ClientConfig, DEFAULT_ENDPOINT};
use crate::transport::{AtTransport, HttpReply, TransportError};
use crate::{AtClient, AtClientError, Result};

// =============================================================================
// In-memory transport
// =============================================================================

/// What a [`ScriptedTransport`] does for one call
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with a reply
    Reply(HttpReply),
    /// Fail below HTTP with a message
    Fail(String),
    /// Never answer; only the client's timeout ends the call
    Hang,
}

impl Step {
    /// A `200` reply with the given body
    pub fn reply(body: impl Into<String>) -> Self {
        Self::Reply(HttpReply::ok(body))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// One recorded call
#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: String,
    pub command: String,
    /// When the call was issued (tokio clock, so it follows paused time)
    pub at: Instant,
}

/// Transport that plays queued steps in order, then repeats a fallback
/// step forever. Every call is recorded.
#[derive(Debug)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(fallback: Step) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Transport that always answers `200` with `body`
    pub fn replying(body: impl Into<String>) -> Self {
        Self::new(Step::reply(body))
    }

    /// Queue a step to play before the fallback
    pub fn then(self, step: Step) -> Self {
        self.queue.lock().push_back(step);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Commands received, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.command.clone()).collect()
    }
}

#[async_trait]
impl AtTransport for ScriptedTransport {
    async fn send(
        &self,
        endpoint: &str,
        command: &str,
    ) -> std::result::Result<HttpReply, TransportError> {
        self.calls.lock().push(Call {
            endpoint: endpoint.to_string(),
            command: command.to_string(),
            at: Instant::now(),
        });

        let step = self
            .queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Reply(reply) => Ok(reply),
            Step::Fail(message) => Err(TransportError::new(message)),
            Step::Hang => std::future::pending().await,
        }
    }
}

// =============================================================================
// Scripted CGI executor
// =============================================================================

#[derive(Debug)]
struct ModemScript {
    responses: HashMap<String, VecDeque<(u16, String)>>,
    fallback: (u16, String),
    received: Vec<String>,
}

/// Fake `get_atcommand` CGI answering per command.
///
/// Replies registered for a command are played in order; the last one is
/// repeated once the others are used up. Unknown commands get `ERROR`.
#[derive(Debug, Clone)]
pub struct ScriptedModem {
    script: Arc<Mutex<ModemScript>>,
}

impl Default for ScriptedModem {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(ModemScript {
                responses: HashMap::new(),
                fallback: (200, "ERROR\r\n".to_string()),
                received: Vec::new(),
            })),
        }
    }

    /// Register a `200` reply for `command`
    pub fn respond(self, command: &str, body: impl Into<String>) -> Self {
        self.respond_with_status(command, 200, body)
    }

    pub fn respond_with_status(self, command: &str, status: u16, body: impl Into<String>) -> Self {
        self.script
            .lock()
            .responses
            .entry(command.to_string())
            .or_default()
            .push_back((status, body.into()));
        self
    }

    /// Commands received so far, in order
    pub fn received(&self) -> Vec<String> {
        self.script.lock().received.clone()
    }

    /// Router serving the executor at the default endpoint
    pub fn router(&self) -> axum::Router {
        axum::Router::new()
            .route(DEFAULT_ENDPOINT, get(handle_atcommand))
            .with_state(self.clone())
    }

    fn reply_for(&self, command: &str) -> (u16, String) {
        let mut script = self.script.lock();
        script.received.push(command.to_string());

        let fallback = script.fallback.clone();
        match script.responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(fallback),
            Some(queue) => queue.front().cloned().unwrap_or(fallback),
            None => fallback,
        }
    }
}

async fn handle_atcommand(
    State(modem): State<ScriptedModem>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let command = params.get("atcmd").cloned().unwrap_or_default();
    let (status, body) = modem.reply_for(&command);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body)
}

// =============================================================================
// Test server
// =============================================================================

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: AtClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use simpleadmin_client::testing::{ScriptedModem, TestServer};
    ///
    /// let modem = ScriptedModem::new().respond("ATI", "Quectel\r\nOK\r\n");
    /// let server = TestServer::start(modem.router()).await?;
    ///
    /// let result = server.client.execute("ATI", &Default::default()).await;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with_connect_timeout(router, Duration::from_secs(2)).await
    }

    /// Serve `router` with a custom client connect timeout
    pub async fn start_with_connect_timeout(
        router: axum::Router,
        connect_timeout: Duration,
    ) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| AtClientError::Transport(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AtClientError::Transport(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut config = ClientConfig::new(format!("http://{}", addr));
        config.connect_timeout_ms = connect_timeout.as_millis() as u64;
        let client = AtClient::with_config(&config)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
