//! Error types for the farm CLI
//!
//! Messages are user-facing: they say what failed and, where there is one,
//! what to try next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// The server answered with a failure envelope
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP request failed before a response arrived
    #[error("Network request failed: {0}. Check that the server is running and FARM_SERVER_URL is correct.")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("Failed to parse server response: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Command-line argument could not be interpreted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status of a server-side failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<farm_common::FarmError> for CliError {
    fn from(err: farm_common::FarmError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        let err = CliError::api(409, "Batch import 'Lô 1' is COMPLETED and cannot cancel");
        assert_eq!(err.status(), Some(409));
        assert_eq!(
            err.to_string(),
            "Server returned 409: Batch import 'Lô 1' is COMPLETED and cannot cancel"
        );
    }

    #[test]
    fn test_enum_parse_error_becomes_invalid_argument() {
        let err: CliError = "flying"
            .parse::<farm_common::types::LivestockStatus>()
            .unwrap_err()
            .into();
        assert!(matches!(err, CliError::InvalidArgument(_)));
        assert_eq!(err.status(), None);
    }
}
