//! Error types for ingestion and storage
//!
//! Every variant is scoped to one fetch, one record or one batch; none of them
//! is meant to take the process down.

use sgw_common::SgwError;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Session used before `connect` or after `close`
    #[error("Client not connected. Open an ingestion session before fetching.")]
    NotConnected,

    #[error("Unsupported parameter: '{0}'")]
    UnsupportedParameter(String),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Envelope carried a non-zero status code
    #[error("API error {code} from {url}: {message}")]
    Api {
        url: String,
        code: i64,
        message: String,
    },

    #[error("Inconsistent response structure from {url}: {reason}")]
    InconsistentPage { url: String, reason: String },

    #[error("Validation failed for {shape} document: {message}")]
    Validation { shape: &'static str, message: String },

    /// No store connection became available before the acquisition timeout
    #[error("Storage connection pool exhausted: acquisition timed out")]
    PoolExhausted,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error(transparent)]
    Common(#[from] SgwError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => IngestError::PoolExhausted,
            other => IngestError::Database(other),
        }
    }
}

impl IngestError {
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    pub fn validation(shape: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            shape,
            message: message.into(),
        }
    }

    /// True for errors a continuation request may succeed on when retried
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Transport { source, .. } => {
                source.is_timeout()
                    || source.is_connect()
                    || source.status().is_some_and(|s| s.is_server_error())
            },
            _ => false,
        }
    }
}
