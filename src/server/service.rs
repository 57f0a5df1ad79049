//! Service lifecycle: binding, accepting and serving connections.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::parser::{Error as ParserError, HttpRequest, parse_head};
use crate::server::config::ServiceConfig;
use crate::server::context::RequestContext;
use crate::server::error::Error;
use crate::server::handler::{HandlerFuture, Routes};
use crate::server::status::StatusCode;
use crate::server::tls;
use crate::server::writer::ResponseWriter;

pub(crate) enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        local_addr: Option<SocketAddr>,
    },
    Stopped,
}

impl Lifecycle {
    /// Roll back a start whose bind failed. A `stop` that landed in the
    /// meantime is kept.
    pub(crate) fn abandon_start(&mut self) {
        if matches!(self, Lifecycle::Running { .. }) {
            *self = Lifecycle::Idle;
        }
    }
}

/// An HTTP service: owns the listener, TLS material and request dispatch.
///
/// A service runs once. [`start`](Service::start) blocks until
/// [`stop`](Service::stop) is called from another task or Ctrl+C is
/// received; misuse of either is reported as an error instead of aborting.
pub struct Service {
    config: ServiceConfig,
    tls: Option<TlsAcceptor>,
    routes: Routes,
    state: Mutex<Lifecycle>,
}

impl Service {
    /// Create a service. Fails if TLS is required and the certificate or key
    /// cannot be loaded.
    pub fn new(config: ServiceConfig) -> Result<Self, Error> {
        let tls = tls::acceptor_from_config(&config)?;
        let routes = Routes::from_config(&config);
        Ok(Self {
            config,
            tls,
            routes,
            state: Mutex::new(Lifecycle::Idle),
        })
    }

    /// Replace the default `501 Not Implemented` handler. Built-in endpoints
    /// still take precedence.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.routes = self.routes.with_fallback(handler);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_state(), Lifecycle::Running { .. })
    }

    /// The bound address while the service is accepting connections.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.lock_state() {
            Lifecycle::Running { local_addr, .. } => local_addr,
            _ => None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log where the service listens and which built-in endpoints are active.
    fn display_service_info(&self, addr: Option<SocketAddr>) {
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        match addr {
            Some(addr) => info!("Service listening on {scheme}://{addr}"),
            None => info!("Service listening on {scheme}://{}", self.config.host_addr()),
        }

        info!("Built-in endpoints:");
        if self.routes.health {
            info!("  * /health");
        }
        if self.routes.options {
            info!("  OPTIONS *");
        }
    }

    /// Set up a Ctrl+C handler that stops the service.
    fn setup_ctrl_c_handler(cancel: CancellationToken, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        info!("Received Ctrl+C, initiating graceful shutdown");
                        cancel.cancel();
                    }
                    Err(e) => error!("Error setting up Ctrl+C handler: {e}"),
                }
            }
        });
    }

    /// Serve a newly accepted connection on its own task.
    fn handle_new_connection(
        &self,
        socket: TcpStream,
        addr: SocketAddr,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = semaphore.clone().try_acquire_owned();
        let routes = self.routes.clone();
        let config = self.config.clone();
        let acceptor = self.tls.clone();
        let cancel = cancel.clone();

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let Ok(_permit) = permit else {
                warn!("Connection limit reached, rejecting connection from {addr}");
                Self::reject(socket).await;
                return;
            };

            let result = match acceptor {
                Some(acceptor) => match acceptor.accept(socket).await {
                    Ok(stream) => Self::handle_connection(stream, &routes, &config, &cancel).await,
                    Err(e) => {
                        warn!("TLS handshake with {addr} failed: {e}");
                        return;
                    }
                },
                None => Self::handle_connection(socket, &routes, &config, &cancel).await,
            };

            if let Err(e) = result {
                error!("Error handling connection from {addr}: {e}");
            }
        });
    }

    async fn reject(socket: TcpStream) {
        let mut writer = ResponseWriter::new(socket);
        writer.set_header("Content-Type", "text/plain");
        writer.write_status(StatusCode::ServiceUnavailable);
        let _ = writer.write(b"Service is at capacity, please try again later").await;
        let _ = writer.finish().await;
    }

    /// Handle connection errors. Returns true when the accept loop should end.
    async fn handle_connection_error(e: io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Wait for in-flight connections, aborting whatever outlives `grace`.
    async fn perform_shutdown(tasks: &mut JoinSet<()>, grace: Duration) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let drained = tokio::time::timeout(grace, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Aborting {len} connections still running after {grace:?}", len = tasks.len());
            tasks.shutdown().await;
        }
        info!("Service shutdown complete");
    }

    /// Bind and serve until stopped.
    ///
    /// Returns [`Error::AlreadyStarted`] if the service is running and
    /// [`Error::AlreadyStopped`] if it has already run.
    pub async fn start(&self) -> Result<(), Error> {
        let cancel = {
            let mut state = self.lock_state();
            match *state {
                Lifecycle::Running { .. } => return Err(Error::AlreadyStarted),
                Lifecycle::Stopped => return Err(Error::AlreadyStopped),
                Lifecycle::Idle => {}
            }
            let cancel = CancellationToken::new();
            *state = Lifecycle::Running {
                cancel: cancel.clone(),
                local_addr: None,
            };
            cancel
        };

        let listener = match TcpListener::bind(self.config.host_addr()).await {
            Ok(listener) => listener,
            Err(e) => {
                self.lock_state().abandon_start();
                return Err(Error::IoError(e));
            }
        };
        let bound = listener.local_addr().ok();
        if let Lifecycle::Running { local_addr, .. } = &mut *self.lock_state() {
            *local_addr = bound;
        }
        self.display_service_info(bound);

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let mut tasks = JoinSet::new();
        Self::setup_ctrl_c_handler(cancel.clone(), &mut tasks);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutting down service...");
                    break;
                }

                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {e}");
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            self.handle_new_connection(socket, addr, &semaphore, &cancel, &mut tasks);
                        }
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        drop(listener);
        cancel.cancel();
        Self::perform_shutdown(&mut tasks, self.config.request_timeout).await;
        *self.lock_state() = Lifecycle::Stopped;
        Ok(())
    }

    /// Stop accepting connections and cancel every in-flight request.
    pub fn stop(&self) -> Result<(), Error> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, Lifecycle::Stopped) {
            Lifecycle::Running { cancel, .. } => {
                info!("Service stop requested");
                cancel.cancel();
                Ok(())
            }
            previous => {
                *state = previous;
                Err(Error::AlreadyStopped)
            }
        }
    }

    /// Serve one request on `stream`.
    ///
    /// The request context's cancellation token is a child of `parent` and
    /// also fires when `request_timeout` elapses or the client closes its
    /// side of the connection.
    pub async fn handle_connection<S>(
        stream: S,
        routes: &Routes,
        config: &ServiceConfig,
        parent: &CancellationToken,
    ) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Send + Sync + 'static,
    {
        let (mut reader, write_half) = tokio::io::split(stream);
        let mut writer = ResponseWriter::new(write_half);

        let request = match tokio::time::timeout(config.request_timeout, read_request(&mut reader, config)).await {
            Err(_) => return Err(Error::RequestTimeout),
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) => return Ok(()), // Connection closed
            Ok(Err(Error::ParseError(e))) => {
                let status = match e {
                    ParserError::BodyTooLarge(..) => StatusCode::PayloadTooLarge,
                    _ => StatusCode::BadRequest,
                };
                writer.set_header("Content-Type", "text/plain");
                writer.write_status(status);
                writer.write(format!("Error parsing request: {e}").as_bytes()).await?;
                writer.finish().await?;
                return Err(Error::ParseError(e));
            }
            Ok(Err(e)) => return Err(e),
        };

        let cancel = parent.child_token();
        let watchdog = {
            let cancel = cancel.clone();
            let deadline = config.request_timeout;
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(deadline) => debug!("Request deadline of {deadline:?} reached"),
                    _ = wait_for_disconnect(&mut reader) => debug!("Client closed the connection"),
                }
                cancel.cancel();
            })
        };

        let mut ctx = RequestContext::new(cancel.clone(), request, writer);
        let id = ctx.id();
        debug!("[{id}] {} {}", ctx.request().method, ctx.request().path);

        let result = routes.dispatch(&mut ctx).await;
        if let Err(e) = &result {
            error!("[{id}] Handler failed: {e}");
            if !ctx.writer().is_committed() {
                let _ = ctx.internal_server_error().await;
            }
        }

        watchdog.abort();
        cancel.cancel();
        let finished = ctx.writer_mut().finish().await;
        result?;
        finished.map_err(Error::WriteError)
    }
}

/// Read and parse one request. `Ok(None)` means the peer closed the
/// connection without sending anything.
async fn read_request<R>(reader: &mut R, config: &ServiceConfig) -> Result<Option<HttpRequest>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(config.read_buffer_size);
    let mut chunk = vec![0; config.read_buffer_size];

    let (mut request, consumed) = loop {
        if let Some(parsed) = parse_head(&buf)? {
            break parsed;
        }
        if buf.len() >= config.read_buffer_size {
            return Err(ParserError::HeadersTooLarge(config.read_buffer_size).into());
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(ParserError::EmptyRequest.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let length = request.content_length()?.unwrap_or(0);
    if length > config.max_body_size {
        return Err(ParserError::BodyTooLarge(length, config.max_body_size).into());
    }

    let mut body = buf.split_off(consumed);
    body.truncate(length);
    while body.len() < length {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        let wanted = (length - body.len()).min(n);
        body.extend_from_slice(&chunk[..wanted]);
    }
    request.body = body;
    Ok(Some(request))
}

/// Resolves once the peer closes its side of the connection or it fails.
async fn wait_for_disconnect<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0; 512];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}
