//! Error types for the Lectio analysis service
//!
//! This module provides error handling using thiserror for structured error
//! definitions and anyhow for error propagation in the binary.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Lectio operations
#[derive(Error, Debug)]
pub enum LectioError {
    /// Request method other than POST
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    /// Request body missing, malformed, or without text
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client exceeded the per-window request cap
    #[error("Rate limit exceeded, resets in {reset_in:?}")]
    RateLimited {
        /// Time until the oldest request in the window expires
        reset_in: Duration,
    },

    /// Model credential is not configured
    #[error("API key not configured")]
    MissingCredential,

    /// Upstream model service returned an error
    #[error("LLM API error: {message}")]
    UpstreamApi {
        /// HTTP status reported by the upstream, when there was one
        status: Option<u16>,
        message: String,
    },

    /// Model response could not be turned into an analysis
    #[error("Failed to parse model response: {message}")]
    Parsing {
        message: String,
        /// Bounded excerpt of the cleaned candidate text
        excerpt: String,
    },

    /// Hosting layer deadline elapsed before the pipeline finished
    #[error("Request deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Lectio operations
pub type Result<T> = std::result::Result<T, LectioError>;

/// Convert anyhow::Error to LectioError
impl From<anyhow::Error> for LectioError {
    fn from(err: anyhow::Error) -> Self {
        LectioError::Other(err.to_string())
    }
}
