//! A small request/response layer on top of a raw HTTP/1.1 server.
//!
//! Every inbound connection becomes a [`RequestContext`]: a correlation id,
//! a cancellation token, the parsed request and a [`ResponseWriter`].
//! Handlers answer through a [`ResponseBuilder`], which writes headers and
//! status immediately but defers the body to a [`ResponseDataFunc`] that only
//! runs on `send`.
//!
//! # Features
//!
//! - Fixed, text, JSON and deferred response bodies
//! - Streaming bodies fed from a channel, stopped cleanly when the request
//!   is cancelled (deadline, client disconnect or service stop)
//! - Service lifecycle with optional TLS, a `/health` endpoint and a
//!   `501 Not Implemented` fallback
//! - Pluggable session stores
//!
//! # Examples
//!
//! ## Deferred bodies
//!
//! ```
//! use microhttp_service::{ResponseDataFunc, ResponseWriter};
//!
//! # tokio_test_block(async {
//! let mut writer = ResponseWriter::new(tokio::io::sink());
//! let mut body = ResponseDataFunc::json(vec!["a", "b"]);
//! assert_eq!(body.call(&mut writer).await.unwrap(), br#"["a","b"]"#);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Streaming from a handler
//!
//! ```no_run
//! use microhttp_service::{ResponseDataFunc, Service, ServiceConfig, StatusCode};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Service::new(ServiceConfig::default())?.with_handler(|ctx| {
//!         Box::pin(async move {
//!             let (tx, rx) = mpsc::channel(8);
//!             tokio::spawn(async move {
//!                 for line in ["one\n", "two\n", "three\n"] {
//!                     if tx.send(line.as_bytes().to_vec()).await.is_err() {
//!                         break;
//!                     }
//!                 }
//!             });
//!             let cancel = ctx.cancellation().clone();
//!             ctx.response_builder()
//!                 .with_header("Content-Type", "text/plain")
//!                 .with_status(StatusCode::Ok)
//!                 .with_body_func(ResponseDataFunc::stream(cancel, rx))
//!                 .send()
//!                 .await
//!         })
//!     });
//!     service.start().await?;
//!     Ok(())
//! }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{
    Error, RequestContext, ResponseBuilder, ResponseDataFunc, ResponseWriter, Service,
    ServiceConfig, StatusCode, StreamAdapter, StreamEnd,
};
