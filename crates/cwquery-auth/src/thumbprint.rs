//! X.509 certificate thumbprints for JWT key identification.
//!
//! The assertion header carries an `x5t` hint: the SHA-1 digest of the
//! DER-encoded signing certificate, base64url-encoded. SHA-1 is what the
//! `x5t` header parameter is defined over (RFC 7515 §4.1.7); it identifies
//! the key, it does not protect anything.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha1::{Digest, Sha1};

use crate::error::AssertionError;

/// Computes the base64url SHA-1 thumbprint of a PEM-encoded certificate.
///
/// # Errors
///
/// Returns [`AssertionError::Signing`] if the input is not parseable PEM.
pub fn x5t_from_pem(cert_pem: &str) -> Result<String, AssertionError> {
    let block = pem::parse(cert_pem)
        .map_err(|e| AssertionError::signing(format!("certificate PEM unreadable: {e}")))?;
    let digest = Sha1::digest(block.contents());
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

/// Reads a certificate file and computes its thumbprint.
///
/// An unreadable certificate is non-fatal for assertion issuance: the hint
/// is omitted and a warning is logged.
#[must_use]
pub fn x5t_from_file(path: &str) -> Option<String> {
    let pem = match std::fs::read_to_string(path) {
        Ok(pem) => pem,
        Err(e) => {
            tracing::warn!(path, error = %e, "certificate unreadable, omitting x5t header");
            return None;
        }
    };
    match x5t_from_pem(&pem) {
        Ok(thumbprint) => Some(thumbprint),
        Err(e) => {
            tracing::warn!(path, error = %e, "certificate unparseable, omitting x5t header");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A PEM block whose DER contents are the ASCII bytes "hello world";
    // enough to pin the digest-and-encode pipeline without a real cert.
    fn pem_for(contents: &[u8]) -> String {
        let body = base64::engine::general_purpose::STANDARD.encode(contents);
        format!("-----BEGIN CERTIFICATE-----\n{body}\n-----END CERTIFICATE-----\n")
    }

    #[test]
    fn test_x5t_matches_known_sha1_vector() {
        // SHA-1("hello world") = 2aae6c35c94fcfb415dbe95f408b9ce91ee846ed
        let pem = pem_for(b"hello world");
        let thumbprint = x5t_from_pem(&pem).unwrap();

        let expected = URL_SAFE_NO_PAD.encode(
            [
                0x2a, 0xae, 0x6c, 0x35, 0xc9, 0x4f, 0xcf, 0xb4, 0x15, 0xdb, 0xe9, 0x5f, 0x40,
                0x8b, 0x9c, 0xe9, 0x1e, 0xe8, 0x46, 0xed,
            ],
        );
        assert_eq!(thumbprint, expected);
    }

    #[test]
    fn test_x5t_rejects_non_pem() {
        assert!(x5t_from_pem("not a pem block").is_err());
    }

    #[test]
    fn test_x5t_from_missing_file_is_none() {
        assert!(x5t_from_file("/nonexistent/cert.pem").is_none());
    }
}
