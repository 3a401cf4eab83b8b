//! API error envelopes.
//!
//! Maps the workspace error taxonomy onto the JSON envelopes the harness
//! client expects: 400 for caller-input problems, the mirrored upstream
//! status for upstream API errors, 408 for the timeout ceiling, 502 for
//! unreachable or misbehaving upstreams, 500 for everything unexpected.
//! Diagnostic verbosity is intentional; the audience is a trusted testing
//! team.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

use cwquery_auth::AssertionError;
use cwquery_client::ClientError;

/// Errors surfaced to the harness client.
#[derive(Debug)]
pub enum ApiError {
    /// The request body failed shape validation (400).
    Validation { error: String, details: Vec<String> },

    /// Assertion issuance failed (400).
    Assertion(AssertionError),

    /// A caller-supplied URL was rejected (400).
    BadRequest { error: String, message: String },

    /// Upstream answered with a non-2xx status; mirrored to the caller.
    UpstreamApi {
        status: u16,
        status_text: String,
        details: Value,
        response_time_ms: Option<u64>,
        /// Attempted registration document, echoed for diagnostics.
        patient_object: Option<Value>,
    },

    /// The upstream attempt hit the hard ceiling (408).
    Timeout {
        timeout_ms: u64,
        response_time_ms: u64,
    },

    /// The upstream was unreachable (502).
    Connection {
        message: String,
        response_time_ms: u64,
    },

    /// A binary retrieval returned a non-Binary envelope (502).
    UnexpectedResourceType { actual: String },

    /// Anything unexpected (500).
    Internal { error: String, message: String },
}

impl ApiError {
    /// Creates a validation error with per-field detail messages.
    #[must_use]
    pub fn validation(error: impl Into<String>, details: Vec<String>) -> Self {
        Self::Validation {
            error: error.into(),
            details,
        }
    }

    /// Creates a generic internal error.
    #[must_use]
    pub fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Maps a client-layer error, attaching the elapsed time where the
    /// envelope carries one.
    #[must_use]
    pub fn from_client(error: ClientError, timeout_ms: u64, response_time_ms: u64) -> Self {
        match error {
            ClientError::InvalidUrl { message } => Self::BadRequest {
                error: "Invalid document URL".to_string(),
                message,
            },
            ClientError::DisallowedDestination { expected_host } => Self::BadRequest {
                error: "Invalid document URL".to_string(),
                message: format!("URL must be from {expected_host} using HTTPS"),
            },
            ClientError::InvalidParameter { message } => {
                Self::validation("Invalid query parameters", vec![message])
            }
            ClientError::Timeout { .. } => Self::Timeout {
                timeout_ms,
                response_time_ms,
            },
            ClientError::Connection { message } => Self::Connection {
                message,
                response_time_ms,
            },
            ClientError::UnexpectedResourceType { actual } => {
                Self::UnexpectedResourceType { actual }
            }
            ClientError::Transport { message } => {
                Self::internal("Internal server error", message)
            }
        }
    }
}

impl From<AssertionError> for ApiError {
    fn from(error: AssertionError) -> Self {
        Self::Assertion(error)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { error, .. } => write!(f, "{error}"),
            Self::Assertion(err) => write!(f, "{err}"),
            Self::BadRequest { error, message } => write!(f, "{error}: {message}"),
            Self::UpstreamApi {
                status, status_text, ..
            } => write!(f, "CommonWell API Error: {status} {status_text}"),
            Self::Timeout { timeout_ms, .. } => {
                write!(f, "Request timed out after {timeout_ms} ms")
            }
            Self::Connection { message, .. } => write!(f, "Connection failure: {message}"),
            Self::UnexpectedResourceType { actual } => {
                write!(f, "Expected Binary resource, got {actual}")
            }
            Self::Internal { error, message } => write!(f, "{error}: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation { error, details } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error, "details": details })),
            )
                .into_response(),

            Self::Assertion(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response(),

            Self::BadRequest { error, message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response(),

            Self::UpstreamApi {
                status,
                status_text,
                details,
                response_time_ms,
                patient_object,
            } => {
                let mut body = json!({
                    "error": format!("CommonWell API Error: {status} {status_text}"),
                    "details": details,
                });
                if let Some(elapsed) = response_time_ms {
                    body["responseTime"] = json!(elapsed);
                }
                if let Some(patient) = patient_object {
                    body["patientObject"] = patient;
                }
                let status = StatusCode::from_u16(status)
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, Json(body)).into_response()
            }

            Self::Timeout {
                timeout_ms,
                response_time_ms,
            } => (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({
                    "error": "Request timeout",
                    "message": format!(
                        "The request to the CommonWell API timed out after {} seconds",
                        timeout_ms / 1000
                    ),
                    "responseTime": response_time_ms,
                })),
            )
                .into_response(),

            Self::Connection {
                message,
                response_time_ms,
            } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Failed to connect to CommonWell API",
                    "message": message,
                    "responseTime": response_time_ms,
                })),
            )
                .into_response(),

            Self::UnexpectedResourceType { actual } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Unexpected response type",
                    "message": format!("Expected Binary resource, got {actual}"),
                })),
            )
                .into_response(),

            Self::Internal { error, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_mapping() {
        let err = ApiError::from_client(
            ClientError::Timeout { timeout_ms: 55_000 },
            55_000,
            55_100,
        );
        assert!(matches!(err, ApiError::Timeout { timeout_ms: 55_000, .. }));

        let err = ApiError::from_client(
            ClientError::connection("dns failure"),
            55_000,
            12,
        );
        assert!(matches!(err, ApiError::Connection { .. }));

        let err = ApiError::from_client(
            ClientError::disallowed_destination("api.example.com"),
            55_000,
            0,
        );
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[test]
    fn test_display_for_upstream_error() {
        let err = ApiError::UpstreamApi {
            status: 403,
            status_text: "Forbidden".to_string(),
            details: json!({}),
            response_time_ms: Some(20),
            patient_object: None,
        };
        assert_eq!(err.to_string(), "CommonWell API Error: 403 Forbidden");
    }
}
