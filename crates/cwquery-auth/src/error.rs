//! Error types for claims decoding and assertion issuance.

/// Errors that can occur while decoding identity tokens or signing
/// assertions.
#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    /// The identity token is not a well-formed compact token.
    #[error("Malformed identity token: {message}")]
    MalformedToken {
        /// Description of what made the token unreadable.
        message: String,
    },

    /// Signing key material is missing or unreadable.
    #[error("Signing key material unavailable: {path}")]
    MissingKeyMaterial {
        /// Path that could not be read.
        path: String,
    },

    /// Signing itself failed.
    #[error("Failed to sign assertion: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },
}

impl AssertionError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `MissingKeyMaterial` error.
    #[must_use]
    pub fn missing_key_material(path: impl Into<String>) -> Self {
        Self::MissingKeyMaterial { path: path.into() }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Returns `true` if the error stems from caller-supplied input rather
    /// than server-side key material.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MalformedToken { .. })
    }
}
