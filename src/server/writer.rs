//! The write side of an HTTP exchange.

use std::fmt::Write as _;
use std::io;
use log::warn;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::server::status::StatusCode;

/// Writes one HTTP/1.1 response to an underlying byte sink.
///
/// [`write_status`] fixes the status; only the first call counts. The status
/// line and header block reach the sink together with the first body bytes
/// or on [`flush`], and headers can no longer change after that. Writing body
/// bytes before any status implies `200 OK`. Responses are always sent with
/// `Connection: close`, so a body without `Content-Length` ends when the
/// connection does.
///
/// [`write_status`]: ResponseWriter::write_status
/// [`flush`]: ResponseWriter::flush
pub struct ResponseWriter {
    sink: Box<dyn AsyncWrite + Send + Sync + Unpin>,
    headers: Vec<(String, String)>,
    status: Option<StatusCode>,
    head_written: bool,
    bytes_written: usize,
    finished: bool,
}

impl ResponseWriter {
    pub fn new<W>(sink: W) -> Self
    where
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        Self {
            sink: Box::new(sink),
            headers: Vec::new(),
            status: None,
            head_written: false,
            bytes_written: 0,
            finished: false,
        }
    }

    /// Set a header, replacing any existing value with the same name.
    /// Ignored once the response head has been sent, and dropped if the name
    /// or value contains CR, LF or NUL.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        if !self.accepts_header(&name, &value) {
            return;
        }
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Add a header line, keeping existing values with the same name.
    /// Used for headers that may repeat, such as `Set-Cookie`.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        if self.accepts_header(&name, &value) {
            self.headers.push((name, value));
        }
    }

    fn accepts_header(&self, name: &str, value: &str) -> bool {
        if self.head_written {
            warn!("Header {name} set after the response head was sent; ignoring");
            return false;
        }
        let forbidden = |c: char| matches!(c, '\r' | '\n' | '\0');
        if name.is_empty() || name.contains(forbidden) || value.contains(forbidden) {
            warn!("Dropping header {name:?}: invalid characters in name or value");
            return false;
        }
        true
    }

    pub fn remove_header(&mut self, name: &str) {
        if !self.head_written {
            self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
    }

    /// Every value set for `name`, in insertion order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The first value set for `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the status is fixed.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// Whether the status line and headers have been sent.
    pub fn is_head_written(&self) -> bool {
        self.head_written
    }

    /// Body bytes accepted by the sink so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Fix the response status. Only the first call has an effect.
    /// Codes outside `100..=999` are ignored.
    pub fn write_status(&mut self, status: StatusCode) {
        if !status.is_valid() {
            warn!("Ignoring invalid status code {}", status.as_u16());
            return;
        }
        if let Some(current) = self.status {
            warn!("Superfluous write_status({status}); status {current} was already written");
            return;
        }
        self.status = Some(status);
    }

    /// Write body bytes, committing `200 OK` first if no status was written.
    pub async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_head().await?;
        self.sink.write_all(buf).await?;
        self.bytes_written += buf.len();
        Ok(buf.len())
    }

    /// Push everything written so far to the client.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.write_head().await?;
        self.sink.flush().await
    }

    /// Complete the response: commit the head if nothing was written, flush
    /// and shut down the sink. Later calls do nothing.
    pub async fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush().await?;
        self.finished = true;
        self.sink.shutdown().await
    }

    async fn write_head(&mut self) -> io::Result<()> {
        if self.head_written {
            return Ok(());
        }
        let status = *self.status.get_or_insert(StatusCode::Ok);

        if self.header("Connection").is_none() {
            self.headers.push(("Connection".to_string(), "close".to_string()));
        }
        if self.header("Server").is_none() {
            self.headers.push(("Server".to_string(), "microhttp-service".to_string()));
        }

        let mut head = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), status.reason_phrase());
        for (name, value) in &self.headers {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        head.push_str("\r\n");

        self.head_written = true;
        self.sink.write_all(head.as_bytes()).await
    }
}
