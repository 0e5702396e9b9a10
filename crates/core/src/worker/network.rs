//! The origin server as seen by the worker.

use async_trait::async_trait;

use crate::Error;
use crate::request::{Request, StoredResponse};

/// Transport-level failure.
///
/// An HTTP error status is not a `NetworkError`: the origin answered, and the
/// response is passed through like any other.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response too large: {0}")]
    TooLarge(String),

    #[error("network error: {0}")]
    Other(String),
}

impl From<NetworkError> for Error {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Timeout(msg) => Error::FetchTimeout(msg),
            NetworkError::TooLarge(msg) => Error::FetchTooLarge(msg),
            NetworkError::Connect(msg) | NetworkError::Other(msg) => Error::Network(msg),
        }
    }
}

/// Source of truth for network responses.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, NetworkError>;
}
