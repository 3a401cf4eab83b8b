//! Error types for upstream-request mediation.

/// Errors that can occur while validating destinations, building requests,
/// or talking to the upstream exchange.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A caller-supplied URL did not parse.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Description of the parse failure.
        message: String,
    },

    /// A caller-supplied URL targets a host or scheme outside the
    /// allow-list.
    #[error("Disallowed destination: URL must be from {expected_host} using HTTPS")]
    DisallowedDestination {
        /// The single hostname allowed for the environment.
        expected_host: String,
    },

    /// The upstream call exceeded the hard timeout and was aborted.
    #[error("Upstream request timed out after {timeout_ms} ms")]
    Timeout {
        /// The configured ceiling in milliseconds.
        timeout_ms: u64,
    },

    /// The upstream was unreachable (DNS, connection refused, TLS
    /// handshake).
    #[error("Failed to connect to upstream: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// A binary retrieval returned something other than a Binary envelope.
    #[error("Expected Binary resource, got {actual}")]
    UnexpectedResourceType {
        /// The resource type actually returned.
        actual: String,
    },

    /// A caller-supplied parameter value could not be interpreted.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the offending value.
        message: String,
    },

    /// Transport construction or request building failed.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

impl ClientError {
    /// Creates a new `InvalidUrl` error.
    #[must_use]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Creates a new `DisallowedDestination` error.
    #[must_use]
    pub fn disallowed_destination(expected_host: impl Into<String>) -> Self {
        Self::DisallowedDestination {
            expected_host: expected_host.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `UnexpectedResourceType` error.
    #[must_use]
    pub fn unexpected_resource_type(actual: impl Into<String>) -> Self {
        Self::UnexpectedResourceType {
            actual: actual.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    #[must_use]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns `true` if the error stems from caller-supplied input.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::DisallowedDestination { .. }
                | Self::InvalidParameter { .. }
        )
    }
}
