//! Attempt classification and execution results

use serde::{Serialize, Serializer};

use crate::command::is_busy_response;
use crate::error::{AtClientError, Result};
use crate::transport::{HttpReply, TransportError};

/// Token whose presence marks a modem-level rejection
pub const ERROR_TOKEN: &str = "ERROR";

/// Outcome of one round trip for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Well-formed reply without the `ERROR` token
    Ok(String),
    /// Well-formed reply carrying the `ERROR` token
    SemanticError(String),
    /// Reply matched a busy pattern
    Busy(String),
    /// Reply body was blank
    EmptyBody(String),
    /// Non-success HTTP status
    Http(u16),
    /// Per-attempt timer fired
    Timeout,
    /// Request failed below HTTP
    TransportError(String),
}

impl AttemptOutcome {
    /// Classify a reply that made it back from the executor
    pub fn classify(reply: HttpReply) -> Self {
        if !reply.is_success() {
            return Self::Http(reply.status);
        }

        let body = reply.body;
        if body.trim().is_empty() {
            Self::EmptyBody(body)
        } else if is_busy_response(&body) {
            Self::Busy(body)
        } else if body.contains(ERROR_TOKEN) {
            Self::SemanticError(body)
        } else {
            Self::Ok(body)
        }
    }

    /// Map a transport result into an outcome
    pub fn from_transport(result: std::result::Result<HttpReply, TransportError>) -> Self {
        match result {
            Ok(reply) => Self::classify(reply),
            Err(err) => Self::TransportError(err.message),
        }
    }

    /// Terminal outcomes end the retry loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok(_) | Self::SemanticError(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Body text received in this attempt, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Ok(body) | Self::SemanticError(body) | Self::Busy(body) | Self::EmptyBody(body) => {
                Some(body)
            }
            Self::Http(_) | Self::Timeout | Self::TransportError(_) => None,
        }
    }

    /// Error recorded for this attempt, `None` on success
    pub fn error(&self) -> Option<AtClientError> {
        match self {
            Self::Ok(_) => None,
            Self::SemanticError(_) => Some(AtClientError::ModemError),
            Self::Busy(_) => Some(AtClientError::Busy),
            Self::EmptyBody(_) => Some(AtClientError::EmptyResponse),
            Self::Http(status) => Some(AtClientError::Http { status: *status }),
            Self::Timeout => Some(AtClientError::Timeout),
            Self::TransportError(message) => Some(AtClientError::Transport(message.clone())),
        }
    }

    /// Short name for log output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::SemanticError(_) => "error",
            Self::Busy(_) => "busy",
            Self::EmptyBody(_) => "empty",
            Self::Http(_) => "http",
            Self::Timeout => "timeout",
            Self::TransportError(_) => "transport",
        }
    }
}

/// Terminal outcome of executing a command or a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub ok: bool,
    /// Accumulated response text, kept on failure for diagnosis
    pub data: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<AtClientError>,
    pub busy: bool,
    /// Round trips made across all retries and batch members
    pub attempts: u32,
}

fn serialize_error<S: Serializer>(
    error: &Option<AtClientError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ExecutionResult {
    pub fn success(data: impl Into<String>, attempts: u32) -> Self {
        Self {
            ok: true,
            data: data.into(),
            error: None,
            busy: false,
            attempts,
        }
    }

    pub fn failure(data: impl Into<String>, error: AtClientError, busy: bool, attempts: u32) -> Self {
        Self {
            ok: false,
            data: data.into(),
            error: Some(error),
            busy,
            attempts,
        }
    }

    /// Rejection of blank or missing input; nothing was sent
    pub fn empty_command() -> Self {
        Self::failure("", AtClientError::EmptyCommand, false, 0)
    }

    /// Response lines with the `OK` terminator filtered out
    pub fn lines(&self) -> Vec<&str> {
        crate::command::split_lines(self.data.as_str())
            .into_iter()
            .filter(|line| *line != "OK")
            .collect()
    }

    /// Convert into a `Result` carrying the response text
    pub fn into_result(self) -> Result<String> {
        match (self.ok, self.error) {
            (true, _) => Ok(self.data),
            (false, Some(err)) => Err(err),
            (false, None) => Err(AtClientError::ModemError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            AttemptOutcome::classify(HttpReply::ok("Quectel\r\nOK\r\n")),
            AttemptOutcome::Ok("Quectel\r\nOK\r\n".into())
        );
        assert!(matches!(
            AttemptOutcome::classify(HttpReply::ok("+CME ERROR: 3")),
            AttemptOutcome::SemanticError(_)
        ));
        assert!(matches!(
            AttemptOutcome::classify(HttpReply::ok("Device busy")),
            AttemptOutcome::Busy(_)
        ));
        assert!(matches!(
            AttemptOutcome::classify(HttpReply::ok(" \r\n")),
            AttemptOutcome::EmptyBody(_)
        ));
        assert_eq!(
            AttemptOutcome::classify(HttpReply::new(503, "busy")),
            AttemptOutcome::Http(503)
        );
    }

    #[test]
    fn test_busy_wins_over_error_token() {
        // A busy reply is retried even when it also carries ERROR
        let outcome = AttemptOutcome::classify(HttpReply::ok("ERROR: port in use"));
        assert!(outcome.is_busy());
        assert!(!outcome.is_terminal());
    }

    #[test]
    fn test_terminal_outcomes() {
        assert!(AttemptOutcome::Ok("OK".into()).is_terminal());
        assert!(AttemptOutcome::SemanticError("ERROR".into()).is_terminal());
        assert!(!AttemptOutcome::Timeout.is_terminal());
        assert!(!AttemptOutcome::Http(500).is_terminal());
        assert!(!AttemptOutcome::EmptyBody(String::new()).is_terminal());
    }

    #[test]
    fn test_from_transport_error() {
        let outcome = AttemptOutcome::from_transport(Err(TransportError::new("connection reset")));
        assert_eq!(
            outcome.error(),
            Some(AtClientError::Transport("connection reset".into()))
        );
        assert_eq!(outcome.body(), None);
    }

    #[test]
    fn test_lines_drop_ok_terminator() {
        let result = ExecutionResult::success("ATI\r\nQuectel\r\nRM520N-GL\r\n\r\nOK\r\n", 1);
        assert_eq!(result.lines(), vec!["ATI", "Quectel", "RM520N-GL"]);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ExecutionResult::success("OK", 1).into_result(), Ok("OK".into()));
        assert_eq!(
            ExecutionResult::empty_command().into_result(),
            Err(AtClientError::EmptyCommand)
        );
    }

    #[test]
    fn test_serialize_error_as_message() {
        let json = serde_json::to_value(ExecutionResult::failure(
            "",
            AtClientError::Busy,
            true,
            3,
        ))
        .unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "The modem is busy. Try again later.");
        assert_eq!(json["busy"], true);
        assert_eq!(json["attempts"], 3);
    }
}
