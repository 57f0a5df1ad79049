//! Request parsing: the read side of an HTTP exchange.
//!
//! Requests are parsed incrementally. [`parse_head`] inspects whatever bytes
//! have been read so far and either reports that more input is needed or
//! returns the request line and headers together with the number of bytes
//! they occupied. The body, if any, is framed by `Content-Length`.

mod error;
mod head;
mod request;

// Re-export public items
pub use error::Error;
pub use head::{HttpVersion, Method, parse_head};
pub use request::{HttpRequest, parse_request};
