//! Signed-assertion issuance.
//!
//! The exchange authorizes calls with a short-lived RS384-signed JWT carrying
//! the organization's identity, a fixed purpose-of-use and role, the
//! subject's display name, and the original identity token embedded
//! verbatim. Key material is re-read from disk on every call; call
//! frequency is interactive-tool low, and skipping the cache keeps key
//! rotation trivial.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::claims::{IdentityClaims, decode_identity_token};
use crate::error::AssertionError;
use crate::thumbprint::x5t_from_file;

/// Fixed audience: the exchange network identifier.
pub const ASSERTION_AUDIENCE: &str = "urn:commonwellalliance.org";

/// Fixed purpose-of-use code for document queries.
pub const PURPOSE_OF_USE: &str = "REQUEST";

/// Fixed subject role code (SNOMED CT, physician).
pub const SUBJECT_ROLE: &str = "116154003";

/// Assertion validity window in seconds.
pub const ASSERTION_TTL_SECS: i64 = 3600;

/// Claim set of the outbound authorization assertion.
///
/// Serialized under the XSPA/XACML wire names the exchange expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer: `urn:oid:<organization oid>`.
    pub iss: String,

    /// Subject: same organization identifier as the issuer.
    pub sub: String,

    /// Audience: the fixed network identifier.
    pub aud: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Not before (Unix timestamp, equals `iat`).
    pub nbf: i64,

    /// Expiry (Unix timestamp, always `iat + ASSERTION_TTL_SECS`).
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,

    /// Purpose-of-use code.
    #[serde(rename = "urn:oasis:names:tc:xspa:1.0:subject:purposeofuse")]
    pub purpose_of_use: String,

    /// Subject role code.
    #[serde(rename = "urn:oasis:names:tc:xacml:2.0:subject:role")]
    pub role: String,

    /// Subject display name.
    #[serde(rename = "urn:oasis:names:tc:xspa:1.0:subject:subject-id")]
    pub subject_id: String,

    /// Organization display name.
    #[serde(rename = "urn:oasis:names:tc:xspa:1.0:subject:organization")]
    pub organization: String,

    /// Organization identifier: `urn:oid:<organization oid>`.
    #[serde(rename = "urn:oasis:names:tc:xspa:1.0:subject:organization-id")]
    pub organization_id: String,

    /// Extension block carrying the original identity token.
    pub extensions: AssertionExtensions,
}

/// Extension claims on the assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionExtensions {
    /// TEFCA individual-access-services extension.
    pub tefca_ias: TefcaIas,
}

/// TEFCA IAS extension body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TefcaIas {
    /// The inbound identity token, carried verbatim, never re-derived.
    pub id_token: String,
}

/// Result of a successful signing call.
///
/// The decoded identity claims are returned alongside the assertion so the
/// caller can reuse them without decoding the token twice.
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    /// The compact three-segment signed assertion.
    pub assertion: String,
    /// Claims decoded from the inbound identity token.
    pub claims: IdentityClaims,
}

/// Builds and signs outbound authorization assertions.
#[derive(Debug, Clone)]
pub struct AssertionSigner {
    key_path: String,
    cert_path: String,
    org_oid: String,
    org_name: String,
}

impl AssertionSigner {
    /// Creates a signer over the configured key material and organization
    /// identity.
    #[must_use]
    pub fn new(
        key_path: impl Into<String>,
        cert_path: impl Into<String>,
        org_oid: impl Into<String>,
        org_name: impl Into<String>,
    ) -> Self {
        Self {
            key_path: key_path.into(),
            cert_path: cert_path.into(),
            org_oid: org_oid.into(),
            org_name: org_name.into(),
        }
    }

    /// Derives and signs an assertion from the given identity token.
    ///
    /// The certificate is used only for the `x5t` header hint; if it is
    /// unreadable the hint is omitted and signing proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::MalformedToken`] if the identity token
    /// cannot be decoded, [`AssertionError::MissingKeyMaterial`] if the
    /// private key file is unreadable, and [`AssertionError::Signing`] if
    /// the key is not valid RSA PEM or signing fails.
    pub fn sign(&self, identity_token: &str) -> Result<SignedAssertion, AssertionError> {
        let claims = decode_identity_token(identity_token)?;

        let key_pem = std::fs::read_to_string(&self.key_path)
            .map_err(|_| AssertionError::missing_key_material(&self.key_path))?;
        let encoding_key = EncodingKey::from_rsa_pem(key_pem.as_bytes())
            .map_err(|e| AssertionError::signing(format!("private key unusable: {e}")))?;

        let org_urn = format!("urn:oid:{}", self.org_oid);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let assertion_claims = AssertionClaims {
            iss: org_urn.clone(),
            sub: org_urn.clone(),
            aud: ASSERTION_AUDIENCE.to_string(),
            iat: now,
            nbf: now,
            exp: now + ASSERTION_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
            purpose_of_use: PURPOSE_OF_USE.to_string(),
            role: SUBJECT_ROLE.to_string(),
            subject_id: claims.display_name(),
            organization: self.org_name.clone(),
            organization_id: org_urn,
            extensions: AssertionExtensions {
                tefca_ias: TefcaIas {
                    id_token: identity_token.to_string(),
                },
            },
        };

        let mut header = Header::new(Algorithm::RS384);
        header.x5t = x5t_from_file(&self.cert_path);

        let assertion = encode(&header, &assertion_claims, &encoding_key)
            .map_err(|e| AssertionError::signing(e.to_string()))?;

        tracing::debug!(jti = %assertion_claims.jti, exp = assertion_claims.exp, "assertion signed");

        Ok(SignedAssertion { assertion, claims })
    }
}
