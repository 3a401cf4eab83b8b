//! Single-attempt upstream request execution.
//!
//! One caller request maps to exactly one upstream attempt: no retries, no
//! backoff. Every attempt carries the signed assertion as a bearer
//! credential, is bounded by a hard timeout that tears down the connection,
//! and is audit-logged on both sides of the wire.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::audit;
use crate::error::ClientError;
use crate::normalize::{self, NormalizedBody};
use crate::transport::{self, TransportConfig};

const FHIR_JSON: &str = "application/fhir+json";

/// An outbound request to the exchange.
#[derive(Debug)]
pub struct UpstreamRequest<'a> {
    /// Operation name used in audit events (e.g. `DocumentReference Query`).
    pub operation: &'a str,
    /// HTTP method.
    pub method: Method,
    /// Fully constructed target URL.
    pub url: &'a str,
    /// Bearer credential (the signed assertion, or a caller-supplied one).
    pub bearer: &'a str,
    /// Optional JSON request body.
    pub body: Option<&'a Value>,
}

/// Normalized outcome of a single upstream attempt.
#[derive(Debug)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers (sanitized copies are what reach the logs).
    pub headers: BTreeMap<String, String>,
    /// Normalized body.
    pub body: NormalizedBody,
    /// Round-trip time in milliseconds.
    pub elapsed_ms: u64,
}

impl UpstreamResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes upstream requests over the mutual-TLS transport.
///
/// The inner client is built once and shared; the executor is cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct UpstreamExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl UpstreamExecutor {
    /// Wraps an already-built client with the given request ceiling.
    #[must_use]
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Builds the transport from config and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the transport cannot be built.
    pub fn from_config(config: &TransportConfig, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self::new(transport::build_client(config)?, timeout))
    }

    /// The configured request ceiling in milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Performs one upstream attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] when the ceiling elapses (the
    /// connection is torn down, not merely abandoned), and
    /// [`ClientError::Connection`] for DNS, connect, and TLS failures.
    /// Non-2xx upstream statuses are NOT errors at this layer; the caller
    /// decides how to mirror them.
    pub async fn execute(
        &self,
        request: UpstreamRequest<'_>,
    ) -> Result<UpstreamResponse, ClientError> {
        let mut audit_headers = BTreeMap::new();
        audit_headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", request.bearer),
        );
        audit_headers.insert("Accept".to_string(), FHIR_JSON.to_string());
        if request.body.is_some() {
            audit_headers.insert("Content-Type".to_string(), FHIR_JSON.to_string());
        }
        audit::log_request(
            request.operation,
            request.method.as_str(),
            request.url,
            &audit_headers,
            request.body,
        );

        let mut builder = self
            .client
            .request(request.method, request.url)
            .timeout(self.timeout)
            .header(AUTHORIZATION, format!("Bearer {}", request.bearer))
            .header(ACCEPT, FHIR_JSON);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, FHIR_JSON).json(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<non-utf8>").to_string(),
                )
            })
            .collect();
        let content_type = headers.get("content-type").cloned();

        let text = response.text().await.map_err(|e| self.classify(e))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let body = normalize::normalize_body(content_type.as_deref(), &text);
        audit::log_response(request.operation, status, &status_text, &headers, elapsed_ms);

        Ok(UpstreamResponse {
            status,
            status_text,
            headers,
            body,
            elapsed_ms,
        })
    }

    fn classify(&self, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout {
                timeout_ms: self.timeout_ms(),
            }
        } else {
            ClientError::connection(error.to_string())
        }
    }
}
