//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for a [`Service`](crate::server::Service).
///
/// Fields are public; the `with_*` methods allow building a configuration
/// fluently from [`ServiceConfig::default`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Host name or address to bind to.
    pub hostname: String,
    /// Port to bind to. `0` picks a free port.
    pub port: u16,
    /// Serve over TLS using `cert_file` and `key_file`.
    pub require_tls: bool,
    /// Bounds reading the request and the lifetime of its cancellation
    /// context.
    pub request_timeout: Duration,
    /// PEM certificate chain.
    pub cert_file: Option<PathBuf>,
    /// PEM private key.
    pub key_file: Option<PathBuf>,
    /// Do not answer `OPTIONS *` automatically.
    pub disable_options_handler: bool,
    /// Do not serve `/health`.
    pub disable_health_handler: bool,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size, which is also the largest accepted request head.
    pub read_buffer_size: usize,
    /// The largest accepted request body.
    pub max_body_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 8080,
            require_tls: false,
            request_timeout: Duration::from_secs(30),
            cert_file: None,
            key_file: None,
            disable_options_handler: false,
            disable_health_handler: false,
            max_connections: 1024,
            read_buffer_size: 8192,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_require_tls(mut self, require_tls: bool) -> Self {
        self.require_tls = require_tls;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_cert_file(mut self, cert_file: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(cert_file.into());
        self
    }

    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    pub fn with_disable_options_handler(mut self, disable: bool) -> Self {
        self.disable_options_handler = disable;
        self
    }

    pub fn with_disable_health_handler(mut self, disable: bool) -> Self {
        self.disable_health_handler = disable;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// `hostname:port`, suitable for binding.
    pub fn host_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}
