//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, SgwError>;

/// Main error type for the common crate
#[derive(Error, Debug)]
pub enum SgwError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Artifact name does not follow `<YYYYMMDD>_<parameter>.<ext>`
    #[error("Malformed source name '{name}': {reason}")]
    MalformedSourceName { name: String, reason: String },

    #[error("Unknown data kind: {0}")]
    UnknownDataKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SgwError {
    /// Create a malformed source name error
    pub fn malformed_source(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSourceName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
