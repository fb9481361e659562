//! Error types shared by the farm crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, FarmError>;

/// Main error type for the shared library
#[derive(Error, Debug)]
pub enum FarmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {kind} value '{value}'")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FarmError {
    pub fn invalid_enum(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnumValue {
            kind,
            value: value.into(),
        }
    }
}
