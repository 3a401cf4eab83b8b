//! Unverified identity-claims extraction.
//!
//! The inbound identity token is a compact three-segment token whose payload
//! segment carries the subject's demographics. Trust in the token is
//! established externally; this module only extracts the claims. Callers
//! must treat the result as unauthenticated unless certified upstream.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::error::AssertionError;

/// A postal address as carried in identity claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsAddress {
    /// Street address line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,

    /// City.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,

    /// State or region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Postal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    /// Country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Decoded payload of the inbound identity token.
///
/// Modeled as explicit optional fields rather than an open map so malformed
/// upstream data is caught at the decode boundary. Unknown fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdentityClaims {
    /// Subject identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Given (first) name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family (last) name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Middle name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    /// Birth date (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,

    /// Gender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// Phone number, possibly with a `+1` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Whether the phone number was verified by the identity provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_verified: Option<bool>,

    /// Current address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ClaimsAddress>,

    /// Previous addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_address: Option<Vec<ClaimsAddress>>,

    /// Expiry timestamp (seconds since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at timestamp (seconds since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl IdentityClaims {
    /// Display name used as the assertion's subject id: given and family
    /// names joined, trimmed when either is absent.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or(""),
            self.family_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// Decodes the payload segment of a compact three-segment token.
///
/// No signature or expiry check is performed. Padding characters in the
/// payload segment are tolerated even though the canonical encoding omits
/// them.
///
/// # Errors
///
/// Returns [`AssertionError::MalformedToken`] if the token does not have
/// exactly three segments, the payload is not valid URL-safe base64, or the
/// decoded payload is not the expected JSON shape.
pub fn decode_identity_token(token: &str) -> Result<IdentityClaims, AssertionError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AssertionError::malformed_token(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AssertionError::malformed_token(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AssertionError::malformed_token(format!("payload is not claims JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Builds a structurally valid token around the given payload JSON.
    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"RS256\",\"typ\":\"JWT\"}");
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decode_roundtrips_claims() {
        let claims = IdentityClaims {
            sub: Some("abc-123".to_string()),
            given_name: Some("Jane".to_string()),
            family_name: Some("Doe".to_string()),
            birthdate: Some("1980-04-02".to_string()),
            phone_number: Some("+15551234567".to_string()),
            phone_number_verified: Some(true),
            ..Default::default()
        };
        let token = token_with_payload(&serde_json::to_value(&claims).unwrap());

        let decoded = decode_identity_token(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_decode_tolerates_padded_payload() {
        use base64::engine::general_purpose::URL_SAFE;
        let payload = URL_SAFE.encode(b"{\"sub\":\"abc\"}");
        let token = format!("h.{payload}.s");

        let decoded = decode_identity_token(&token).unwrap();
        assert_eq!(decoded.sub.as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let token = token_with_payload(&json!({
            "sub": "abc",
            "some_vendor_extension": {"nested": true}
        }));
        let decoded = decode_identity_token(&token).unwrap();
        assert_eq!(decoded.sub.as_deref(), Some("abc"));
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        for token in ["justone", "two.segments", "a.b.c.d"] {
            let err = decode_identity_token(token).unwrap_err();
            assert!(matches!(err, AssertionError::MalformedToken { .. }), "{token}");
        }
    }

    #[test]
    fn test_non_base64_payload_is_malformed() {
        let err = decode_identity_token("h.!!not-base64!!.s").unwrap_err();
        assert!(matches!(err, AssertionError::MalformedToken { .. }));
    }

    #[test]
    fn test_non_json_payload_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode(b"plain text, not json");
        let err = decode_identity_token(&format!("h.{payload}.s")).unwrap_err();
        assert!(matches!(err, AssertionError::MalformedToken { .. }));
    }

    #[test]
    fn test_display_name_handles_missing_parts() {
        let both = IdentityClaims {
            given_name: Some("Jane".to_string()),
            family_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(both.display_name(), "Jane Doe");

        let only_family = IdentityClaims {
            family_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(only_family.display_name(), "Doe");

        assert_eq!(IdentityClaims::default().display_name(), "");
    }
}
