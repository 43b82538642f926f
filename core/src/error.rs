//! Error types for request execution.
//!
//! # Design
//! HTTP status codes never show up here: a 404 or a 500 is an ordinary
//! [`Response`](crate::Response). Errors are reserved for bad arguments
//! (raised before any I/O), connection-level failures reported by the
//! transport, and bodies that cannot be decoded the way their headers claim.

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by request building and execution.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The call arguments are inconsistent; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// DNS resolution, refused or reset connection, or another non-HTTP failure.
    #[error("connection failed: {0}")]
    ConnectionFailure(String),

    /// Certificate or hostname verification failed while `verify` was on.
    #[error("TLS verification failed: {0}")]
    TlsVerificationFailure(String),

    /// The configured timeout elapsed before the exchange completed.
    #[error("request timed out after {0:?}")]
    TimeoutExceeded(Duration),

    /// The response declared a JSON content type but the body is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    JsonDecodeFailure(#[source] serde_json::Error),

    /// The response declared gzip content encoding but the body could not be inflated.
    #[error("failed to decode response content: {0}")]
    ContentDecodeFailure(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Translate a transport failure; `budget` is the timeout the call ran with.
    pub(crate) fn from_transport(err: TransportError, budget: Duration) -> Self {
        match err {
            TransportError::Connection(msg) => Error::ConnectionFailure(msg),
            TransportError::Tls(msg) => Error::TlsVerificationFailure(msg),
            TransportError::Timeout => Error::TimeoutExceeded(budget),
            TransportError::InvalidRequest(msg) => Error::InvalidArgument(msg),
        }
    }
}
