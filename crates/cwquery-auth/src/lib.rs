//! Identity-claims decoding and signed-assertion issuance.
//!
//! This crate covers the trust-sensitive half of the harness: it extracts
//! claims from an externally issued identity token (without verifying it;
//! trust is established upstream), and mints the short-lived RS384-signed
//! authorization assertion the exchange requires, carrying organization
//! identity, purpose of use, and the original identity token verbatim.

pub mod assertion;
pub mod claims;
pub mod error;
pub mod thumbprint;

pub use assertion::{AssertionClaims, AssertionSigner, SignedAssertion, ASSERTION_TTL_SECS};
pub use claims::{decode_identity_token, ClaimsAddress, IdentityClaims};
pub use error::AssertionError;
