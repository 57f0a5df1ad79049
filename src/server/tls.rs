//! TLS configuration and certificate loading.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

use crate::server::config::ServiceConfig;
use crate::server::error::Error;

/// Build the acceptor for `config`, or `None` when TLS is not required.
pub fn acceptor_from_config(config: &ServiceConfig) -> Result<Option<TlsAcceptor>, Error> {
    if !config.require_tls {
        return Ok(None);
    }
    let cert_path = config
        .cert_file
        .as_deref()
        .ok_or_else(|| Error::TlsError("TLS required but no certificate file configured".to_string()))?;
    let key_path = config
        .key_file
        .as_deref()
        .ok_or_else(|| Error::TlsError("TLS required but no key file configured".to_string()))?;
    load_tls_acceptor(cert_path, key_path).map(Some)
}

/// Load a PEM certificate chain and private key into a TLS acceptor that
/// offers HTTP/1.1 over ALPN.
pub fn load_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, Error> {
    let cert_pem = fs::read(cert_path).map_err(|e| {
        Error::TlsError(format!("Cannot read certificate file {}: {e}", cert_path.display()))
    })?;
    let key_pem = fs::read(key_path).map_err(|e| {
        Error::TlsError(format!("Cannot read private key file {}: {e}", key_path.display()))
    })?;

    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<CertificateDer<'static>>, _>>()
        .map_err(|e| Error::TlsError(format!("Invalid certificate file {}: {e}", cert_path.display())))?;
    if certs.is_empty() {
        return Err(Error::TlsError(format!("No certificates found in {}", cert_path.display())));
    }

    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| Error::TlsError(format!("Invalid private key file {}: {e}", key_path.display())))?
        .ok_or_else(|| Error::TlsError(format!("No private key found in {}", key_path.display())))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut server_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::TlsError(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::TlsError(e.to_string()))?;
    server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}
