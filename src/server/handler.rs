//! Top-level handler and the built-in endpoints.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::Method;
use crate::server::config::ServiceConfig;
use crate::server::context::RequestContext;
use crate::server::error::Error;
use crate::server::status::StatusCode;

/// Future returned by a handler. It may borrow the request context.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// A handler that serves a request through its context.
pub type HandlerFn = Arc<dyn for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync>;

/// Dispatch table: the built-in endpoints in front of one top-level handler.
#[derive(Clone)]
pub struct Routes {
    pub health: bool,
    pub options: bool,
    pub fallback: HandlerFn,
}

impl Routes {
    /// Built-ins as enabled by `config`, with the 501 fallback.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            health: !config.disable_health_handler,
            options: !config.disable_options_handler,
            fallback: Arc::new(handle_not_implemented),
        }
    }

    /// Replace the handler for requests no built-in endpoint claims.
    pub fn with_fallback<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.fallback = Arc::new(handler);
        self
    }

    /// Serve `ctx` with the first matching endpoint.
    pub async fn dispatch(&self, ctx: &mut RequestContext) -> Result<(), Error> {
        let request = ctx.request();
        if self.health && request.path_only() == "/health" {
            return handle_health(ctx).await;
        }
        if self.options && request.method == Method::OPTIONS && request.path == "*" {
            return handle_options(ctx).await;
        }
        (self.fallback)(ctx).await
    }
}

/// `200 OK` with body `OK`.
pub fn handle_health(ctx: &mut RequestContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.response_builder()
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_status(StatusCode::Ok)
            .with_body("OK")
            .send()
            .await
    })
}

/// `OPTIONS *`: an empty `200 OK`.
pub fn handle_options(ctx: &mut RequestContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        ctx.response_builder()
            .with_header("Content-Length", "0")
            .with_status(StatusCode::Ok)
            .send()
            .await
    })
}

/// `501 Not Implemented` for anything no handler claimed.
pub fn handle_not_implemented(ctx: &mut RequestContext) -> HandlerFuture<'_> {
    Box::pin(ctx.not_implemented())
}
