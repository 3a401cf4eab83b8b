//! Mutual-TLS transport construction.
//!
//! The exchange authenticates callers with a client certificate. The
//! transport is a single `reqwest::Client` built at startup from configured
//! PEM paths and treated as immutable for the process lifetime. When the
//! certificate or key is absent the client still functions over standard
//! TLS, with a warning, so the harness stays usable against endpoints that
//! do not require mutual TLS.

use std::path::Path;

use crate::error::ClientError;

/// File paths and flags the transport is built from.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Client certificate (PEM).
    pub cert_path: String,
    /// Client private key (PEM).
    pub key_path: String,
    /// Optional CA bundle (PEM) used as an additional trust anchor.
    pub ca_path: Option<String>,
    /// Disables peer-certificate validation. Test-only; a warning is
    /// emitted whenever it is set.
    pub skip_verify: bool,
}

/// Builds the upstream HTTP client.
///
/// # Errors
///
/// Returns [`ClientError::Transport`] if present key material or CA bundle
/// cannot be loaded, or if client construction fails. Absent cert/key files
/// are not an error; the client degrades to standard TLS.
pub fn build_client(config: &TransportConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().use_native_tls();

    let cert_exists = Path::new(&config.cert_path).exists();
    let key_exists = Path::new(&config.key_path).exists();

    if cert_exists && key_exists {
        let identity = load_identity(&config.cert_path, &config.key_path)?;
        builder = builder.identity(identity);
        tracing::info!(
            cert_path = %config.cert_path,
            "client certificate loaded, mutual TLS enabled"
        );
    } else {
        tracing::warn!(
            cert_path = %config.cert_path,
            key_path = %config.key_path,
            "client certificate not found, falling back to standard TLS"
        );
    }

    if let Some(ca_path) = &config.ca_path {
        if Path::new(ca_path).exists() {
            let ca_pem = std::fs::read(ca_path)
                .map_err(|e| ClientError::transport(format!("CA bundle unreadable: {e}")))?;
            let ca = reqwest::Certificate::from_pem(&ca_pem)
                .map_err(|e| ClientError::transport(format!("CA bundle unparseable: {e}")))?;
            builder = builder.add_root_certificate(ca);
        }
    }

    if config.skip_verify {
        tracing::warn!("TLS certificate verification is disabled. Use only for testing!");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| ClientError::transport(format!("client construction failed: {e}")))
}

/// Loads the client identity from separate cert and key PEM files.
fn load_identity(cert_path: &str, key_path: &str) -> Result<reqwest::Identity, ClientError> {
    let key = std::fs::read(key_path)
        .map_err(|e| ClientError::transport(format!("client key unreadable: {e}")))?;
    let cert = std::fs::read(cert_path)
        .map_err(|e| ClientError::transport(format!("client certificate unreadable: {e}")))?;

    reqwest::Identity::from_pkcs8_pem(&cert, &key)
        .map_err(|e| ClientError::transport(format!("client identity unusable: {e}")))
}
