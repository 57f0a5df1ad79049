//! Error types for the service layer.

use thiserror::Error;

use crate::parser::Error as ParserError;

/// Errors produced while serving requests or managing the service.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound request could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error on the connection outside of body writing.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The transport failed while response bytes were being written. Part of
    /// the body may already have reached the client.
    #[error("Error writing response body: {0}")]
    WriteError(#[source] std::io::Error),

    /// A response body could not be serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A deferred body producer reported a failure.
    #[error("Error producing response body: {0}")]
    BodyError(String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// TLS material could not be loaded.
    #[error("TLS configuration error: {0}")]
    TlsError(String),

    /// The session store failed.
    #[error("Session error: {0}")]
    SessionError(String),

    /// `start` was called on a running service.
    #[error("Service already started")]
    AlreadyStarted,

    /// `stop` was called on a service that is not running, or `start` on one
    /// that has been stopped.
    #[error("Service already stopped")]
    AlreadyStopped,

    /// The request did not arrive within the configured timeout.
    #[error("Timed out reading request")]
    RequestTimeout,
}
