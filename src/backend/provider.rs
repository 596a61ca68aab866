//! Query backend trait
//!
//! Abstracts the conversational backend so the gateway's session lifecycle
//! can run against the real HTTP API or an in-process fake.

use futures::stream::Stream;
use std::io;
use std::pin::Pin;
use thiserror::Error;

use super::types::AnswerFragment;

/// Incrementally delivered answer
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<AnswerFragment, BackendError>> + Send>>;

/// Failures of a single backend call
#[derive(Error, Debug)]
pub enum BackendError {
    /// The access token is invalid or expired (HTTP 401)
    #[error("Access token rejected")]
    Unauthorized,

    /// The call exceeded its bounded wait
    #[error("Backend call timed out")]
    Timeout,

    /// Non-success HTTP status other than 401
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Login completed without issuing an access token
    #[error("Login did not issue an access token")]
    MissingToken,

    /// Response did not have the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        BackendError::Protocol(msg.into())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_decode() {
            BackendError::Protocol(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

impl From<io::Error> for BackendError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut {
            BackendError::Timeout
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// A conversational backend reachable with per-identity access tokens
#[async_trait::async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run the two-step handshake and return a fresh access token
    async fn create_session(&self, identity: &str) -> Result<String, BackendError>;

    /// Ask a question with `token`, returning the answer as a stream
    ///
    /// A rejected token is reported as [`BackendError::Unauthorized`] before
    /// any fragment is produced.
    async fn ask(&self, token: &str, question: &str) -> Result<FragmentStream, BackendError>;

    /// Get the backend name (for logs)
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err: BackendError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, BackendError::Timeout));

        let err: BackendError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::Status {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.to_string(), "Backend returned 500: oops");
    }
}
