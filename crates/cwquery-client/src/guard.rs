//! Destination allow-listing for caller-supplied URLs.
//!
//! Document-retrieval URLs come from the client. A URL is dereferenced
//! only if it parses, uses HTTPS, and targets exactly the hostname
//! configured for the environment; anything else is rejected before a
//! request is issued.

use url::Url;

use crate::error::ClientError;

/// Validates a caller-supplied retrieval URL against the environment's
/// single allowed hostname.
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] if the URL does not parse and
/// [`ClientError::DisallowedDestination`] on any scheme or hostname
/// mismatch.
pub fn validate_document_url(raw_url: &str, expected_host: &str) -> Result<Url, ClientError> {
    let url =
        Url::parse(raw_url).map_err(|e| ClientError::invalid_url(format!("{raw_url}: {e}")))?;

    if url.scheme() != "https" || url.host_str() != Some(expected_host) {
        return Err(ClientError::disallowed_destination(expected_host));
    }

    Ok(url)
}
