//! Error types for the request parser.

use thiserror::Error;

/// Errors that can occur while reading an HTTP request.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is missing.
    #[error("Invalid HTTP path")]
    InvalidPath,

    /// The request line does not have the `METHOD TARGET VERSION` shape.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The HTTP version in the request is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// A header line has no `:` separator or an empty name.
    #[error("Invalid header format: {0}")]
    InvalidHeaderFormat(String),

    /// The connection was closed before a complete request arrived.
    #[error("Empty request")]
    EmptyRequest,

    /// The request head did not fit in the read buffer.
    #[error("Request head exceeds {0} bytes")]
    HeadersTooLarge(usize),

    /// The declared body is larger than the configured limit.
    #[error("Request body of {0} bytes exceeds the limit of {1} bytes")]
    BodyTooLarge(usize, usize),

    /// `Content-Length` is not a non-negative integer.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Only identity-framed bodies are accepted.
    #[error("Unsupported Transfer-Encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// Error parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
