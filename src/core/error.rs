//! Gateway error types

use thiserror::Error;

/// Errors that can occur inside the gateway's own plumbing
///
/// These never cross `SessionGateway::ask`; the session store absorbs them
/// and reports plain booleans / `None` to its callers.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file could not be read or written as CSV
    #[error("Session file error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        GatewayError::InvalidConfig(msg.into())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
