//! simpleadmin AT Command Client
//!
//! Request/response client for the router's AT command CGI executor. The
//! modem has a single, serialized AT channel that can reject requests while
//! busy, drop them, or answer with an empty body; the client normalizes
//! command input, runs batches strictly in order, retries transient
//! failures with a linear backoff, and reports every outcome as data.
//!
//! # Example
//!
//! ```rust,no_run
//! use simpleadmin_client::{AtClient, ExecOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AtClient::new("http://192.168.225.1")?;
//!
//!     // A batch: split on ';' and newlines, `AT` prefix added where missing
//!     let result = client
//!         .execute("ATI;+CGMI\n+CGMM", &ExecOptions::new().retries(3))
//!         .await;
//!
//!     if result.ok {
//!         for line in result.lines() {
//!             println!("{}", line);
//!         }
//!     } else if result.busy {
//!         eprintln!("modem busy after {} attempts", result.attempts);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! The `parse` module turns the responses of the known query batches into
//! typed values; `radio` reads the current radio settings and builds the
//! commands that change them.
//!
//! # Testing
//!
//! The `testing` module provides a scripted in-memory transport and a
//! scripted CGI executor that can be served over HTTP:
//!
//! ```rust,ignore
//! use simpleadmin_client::testing::{ScriptedModem, TestServer};
//!
//! let modem = ScriptedModem::new().respond("ATI", "Quectel\r\nOK\r\n");
//! let server = TestServer::start(modem.router()).await?;
//! let result = server.client.execute("ATI", &Default::default()).await;
//! ```

mod client;
pub mod command;
mod config;
mod error;
pub mod parse;
pub mod radio;
mod result;
pub mod testing;
mod transport;

pub use client::{backoff_delay, AtClient, HEALTH_CHECK_COMMAND};
pub use command::{
    is_busy_response, normalize_commands, sanitize, split_lines, Command, CommandBatch,
    CommandInput,
};
pub use config::{
    ClientConfig, ExecOptions, ResolvedOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
    DEFAULT_RETRIES, DEFAULT_TIMEOUT,
};
pub use error::{AtClientError, Result};
pub use result::{AttemptOutcome, ExecutionResult, ERROR_TOKEN};
pub use transport::{AtTransport, HttpReply, HttpTransport, TransportError};
