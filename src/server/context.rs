//! Per-request state shared by handlers, builders and session stores.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::parser::HttpRequest;
use crate::server::builder::ResponseBuilder;
use crate::server::writer::ResponseWriter;

/// Session name used when a request does not choose its own.
pub const DEFAULT_SESSION_NAME: &str = "http-session";

/// Everything a handler needs for one exchange: a correlation id, the
/// cancellation signal, the parsed request and the response writer.
///
/// A context belongs to the task serving its connection and is never shared
/// between requests.
pub struct RequestContext {
    id: Uuid,
    session_name: String,
    cancel: CancellationToken,
    request: HttpRequest,
    writer: ResponseWriter,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken, request: HttpRequest, writer: ResponseWriter) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            cancel,
            request,
            writer,
        }
    }

    /// Use a different session name. Takes the context by value so the name
    /// is settled before anything borrows it.
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    /// Unique id, used to correlate log lines for this request.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Fires on request deadline, client disconnect or service stop.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Start assembling the response for this request.
    pub fn response_builder(&mut self) -> ResponseBuilder<'_> {
        ResponseBuilder::new(self)
    }
}
