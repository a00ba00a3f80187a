//! Error types for listwatch.

use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Network { status: u16, url: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Write call was still rejected after refreshing the CSRF token.
    #[error("Request to {url} was rejected as unauthorized after token refresh")]
    Authorization { url: String },
    #[error("No CSRF token could be found on the page")]
    TokenUnavailable,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Automation failed: {0}")]
    Automation(String),
}

impl Error {
    /// True for failures the poll loops recover from on their next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Transport(_))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
