//! Error types for AT client operations

use thiserror::Error;

/// Result type alias for AT client operations
pub type Result<T> = std::result::Result<T, AtClientError>;

/// Errors that can occur during AT client operations
///
/// Execution errors are carried as data inside an
/// [`ExecutionResult`](crate::ExecutionResult); only construction and
/// configuration loading return them as `Err`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtClientError {
    /// Command was blank after sanitization
    #[error("Empty or invalid AT command.")]
    EmptyCommand,

    /// Executor answered with a non-success status
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// Executor answered with a blank body
    #[error("Empty response from the modem.")]
    EmptyResponse,

    /// Response matched one of the busy patterns
    #[error("The modem is busy. Try again later.")]
    Busy,

    /// Response contained the `ERROR` token
    #[error("The modem returned ERROR.")]
    ModemError,

    /// Per-attempt timer fired before the response arrived
    #[error("AT request timed out.")]
    Timeout,

    /// Network-level failure
    #[error("{0}")]
    Transport(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A radio setting value was rejected before any command was built
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

impl AtClientError {
    /// Whether another attempt could change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::EmptyResponse | Self::Busy | Self::Timeout | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(AtClientError::Http { status: 502 }.to_string(), "HTTP 502");
        assert_eq!(
            AtClientError::Timeout.to_string(),
            "AT request timed out."
        );
        assert_eq!(
            AtClientError::Transport("connection refused".into()).to_string(),
            "connection refused"
        );
        assert_eq!(
            AtClientError::InvalidSetting("SIM slot 3".into()).to_string(),
            "Invalid setting: SIM slot 3"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(AtClientError::Busy.is_retryable());
        assert!(AtClientError::Timeout.is_retryable());
        assert!(!AtClientError::ModemError.is_retryable());
        assert!(!AtClientError::EmptyCommand.is_retryable());
        assert!(!AtClientError::InvalidSetting(String::new()).is_retryable());
    }
}
