//! Structured audit logging for upstream traffic.
//!
//! Every request/response pair is recorded, before sending and after
//! receiving. Authorization header values are truncated so signed
//! assertions never land in logs whole.

use std::collections::BTreeMap;

/// Longest authorization-header prefix kept in logs.
const AUTHORIZATION_PREVIEW_LEN: usize = 100;

/// Returns a copy of the headers safe for logging: authorization-type
/// values longer than the preview length are truncated and marked.
#[must_use]
pub fn sanitize_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization")
                && value.len() > AUTHORIZATION_PREVIEW_LEN
            {
                (
                    name.clone(),
                    format!("{}...[truncated]", &value[..AUTHORIZATION_PREVIEW_LEN]),
                )
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Truncates a token-sized string for event logging.
#[must_use]
pub fn preview(value: &str) -> String {
    if value.len() > AUTHORIZATION_PREVIEW_LEN {
        format!("{}...[truncated]", &value[..AUTHORIZATION_PREVIEW_LEN])
    } else {
        value.to_string()
    }
}

/// Emits the pre-send audit event for an upstream request.
pub fn log_request(
    operation: &str,
    method: &str,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: Option<&serde_json::Value>,
) {
    let sanitized = sanitize_headers(headers);
    tracing::info!(
        audit = "request",
        operation,
        method,
        url,
        headers = %serde_json::to_string(&sanitized).unwrap_or_default(),
        body = %body.map(ToString::to_string).unwrap_or_else(|| "null".to_string()),
        "upstream request"
    );
}

/// Emits the post-receive audit event for an upstream response.
pub fn log_response(
    operation: &str,
    status: u16,
    status_text: &str,
    headers: &BTreeMap<String, String>,
    elapsed_ms: u64,
) {
    let sanitized = sanitize_headers(headers);
    if status >= 400 {
        tracing::error!(
            audit = "response",
            operation,
            status,
            status_text,
            headers = %serde_json::to_string(&sanitized).unwrap_or_default(),
            elapsed_ms,
            "upstream response"
        );
    } else {
        tracing::info!(
            audit = "response",
            operation,
            status,
            status_text,
            headers = %serde_json::to_string(&sanitized).unwrap_or_default(),
            elapsed_ms,
            "upstream response"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_authorization_value_is_truncated() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", "x".repeat(200)));
        headers.insert("Accept".to_string(), "application/fhir+json".to_string());

        let sanitized = sanitize_headers(&headers);
        let auth = &sanitized["Authorization"];
        assert!(auth.ends_with("...[truncated]"));
        assert!(auth.len() < 130);
        assert_eq!(sanitized["Accept"], "application/fhir+json");
    }

    #[test]
    fn test_short_authorization_value_is_kept() {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), "Bearer short".to_string());

        let sanitized = sanitize_headers(&headers);
        assert_eq!(sanitized["authorization"], "Bearer short");
    }

    #[test]
    fn test_preview_truncates_only_long_values() {
        assert_eq!(preview("short"), "short");
        assert!(preview(&"y".repeat(300)).ends_with("...[truncated]"));
    }
}
