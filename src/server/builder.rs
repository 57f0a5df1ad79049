//! Fluent response assembly.

use log::error;

use crate::server::context::RequestContext;
use crate::server::data::ResponseDataFunc;
use crate::server::error::Error;
use crate::server::status::StatusCode;

/// Assembles the response for one request.
///
/// Headers and status go to the writer as soon as they are set. The first
/// status wins, and headers stop changing once body bytes are flushed. The
/// body is held as a [`ResponseDataFunc`] and only produced by
/// [`send`](ResponseBuilder::send).
pub struct ResponseBuilder<'a> {
    request: &'a mut RequestContext,
    body_func: Option<ResponseDataFunc>,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(request: &'a mut RequestContext) -> Self {
        Self { request, body_func: None }
    }

    pub fn with_header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.writer_mut().set_header(key, value);
        self
    }

    /// Fix the status. Only the first status takes effect. Accepts a
    /// [`StatusCode`] or a bare `u16`.
    pub fn with_status(self, status: impl Into<StatusCode>) -> Self {
        self.request.writer_mut().write_status(status.into());
        self
    }

    /// Replace the body with fixed bytes.
    pub fn with_body(self, body: impl Into<Vec<u8>>) -> Self {
        self.with_body_func(ResponseDataFunc::binary(body))
    }

    /// Replace the body producer.
    pub fn with_body_func(mut self, body_func: ResponseDataFunc) -> Self {
        self.body_func = Some(body_func);
        self
    }

    /// Run the body producer and write what it yields.
    ///
    /// Every call runs the installed producer again. Without a producer an
    /// empty body is written. Failures are logged against the request id and
    /// returned; nothing is retried.
    pub async fn send(&mut self) -> Result<(), Error> {
        let id = self.request.id();
        let method = self.request.request().method;
        let path = self.request.request().path.clone();

        let body = match self.body_func.as_mut() {
            Some(body_func) => match body_func.call(self.request.writer_mut()).await {
                Ok(body) => body,
                Err(e) => {
                    error!("[{id}] {method} {path}: error getting response body: {e}");
                    return Err(e);
                }
            },
            None => Vec::new(),
        };

        if let Err(e) = self.request.writer_mut().write(&body).await {
            error!("[{id}] {method} {path}: error writing response body: {e}");
            return Err(Error::WriteError(e));
        }
        Ok(())
    }
}
