//! Service layer: request contexts, deferred and streaming responses,
//! sessions and the service lifecycle.

mod builder;
mod config;
mod context;
mod data;
mod error;
mod handler;
mod respond;
mod service;
mod session;
mod status;
mod stream;
pub mod tls;
mod writer;

// Re-export public items
pub use builder::ResponseBuilder;
pub use config::ServiceConfig;
pub use context::{DEFAULT_SESSION_NAME, RequestContext};
pub use data::{BodyFuture, ResponseDataFunc};
pub use error::Error;
pub use handler::{HandlerFn, HandlerFuture, Routes, handle_health, handle_not_implemented, handle_options};
pub use service::Service;
pub use session::{MemoryStore, SameSite, Session, SessionData, SessionOptions, SessionStore};
pub use status::StatusCode;
pub use stream::{StreamAdapter, StreamEnd};
pub use writer::ResponseWriter;
