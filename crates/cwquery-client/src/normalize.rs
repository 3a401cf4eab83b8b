//! Upstream response normalization.
//!
//! Upstream bodies arrive as JSON, XML, or binary wrapped in a JSON
//! envelope. Normalization turns all of them into one shape clients can
//! consume: parsed JSON where the declared content type is JSON and the
//! body actually parses, a raw-text fallback otherwise. Binary envelopes
//! get an extra validation step; their base64 payload is never decoded
//! here.

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

/// Normalized upstream body.
///
/// Serializes either as the parsed JSON value itself or as the
/// `{rawResponse, contentType}` fallback object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedBody {
    /// The body parsed as JSON.
    Json(Value),
    /// Fallback for non-JSON or unparseable bodies.
    Raw {
        /// The body as received.
        #[serde(rename = "rawResponse")]
        raw_response: String,
        /// The declared content type, if any.
        #[serde(rename = "contentType")]
        content_type: Option<String>,
    },
}

impl NormalizedBody {
    /// Returns the parsed JSON value, if this body is JSON.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw { .. } => None,
        }
    }
}

/// Returns `true` if the declared content type indicates a JSON body,
/// including the FHIR variant.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.contains("application/json") || content_type.contains("application/fhir+json")
}

/// Normalizes a response body given its declared content type.
///
/// JSON-typed bodies that fail to parse fall back to raw rather than
/// raising; the caller sees exactly what the upstream sent.
#[must_use]
pub fn normalize_body(content_type: Option<&str>, text: &str) -> NormalizedBody {
    if content_type.is_some_and(is_json_content_type) {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return NormalizedBody::Json(value);
        }
    }
    NormalizedBody::Raw {
        raw_response: text.to_string(),
        content_type: content_type.map(ToString::to_string),
    }
}

/// A validated Binary envelope.
///
/// The `data` field stays base64-encoded; rendering (PDF embed, image,
/// formatted XML) is the caller's concern.
#[derive(Debug, Clone, Serialize)]
pub struct BinaryPayload {
    /// Content type of the wrapped document.
    #[serde(rename = "contentType")]
    pub content_type: String,
    /// Base64 document bytes, passed through opaquely.
    pub data: Option<String>,
    /// Upstream resource id.
    pub id: Option<String>,
}

/// Validates that a normalized body is a Binary envelope.
///
/// # Errors
///
/// Returns [`ClientError::UnexpectedResourceType`] when the body is not
/// JSON or its `resourceType` is anything other than `Binary`.
pub fn expect_binary(body: &NormalizedBody) -> Result<BinaryPayload, ClientError> {
    let value = body
        .as_json()
        .ok_or_else(|| ClientError::unexpected_resource_type("non-JSON response"))?;

    let resource_type = value
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    if resource_type != "Binary" {
        return Err(ClientError::unexpected_resource_type(resource_type));
    }

    Ok(BinaryPayload {
        content_type: value
            .get("contentType")
            .and_then(Value::as_str)
            .unwrap_or("application/octet-stream")
            .to_string(),
        data: value.get("data").and_then(Value::as_str).map(ToString::to_string),
        id: value.get("id").and_then(Value::as_str).map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fhir_json_parses_to_object() {
        let body = normalize_body(
            Some("application/fhir+json; charset=utf-8"),
            r#"{"resourceType":"Bundle","total":2}"#,
        );
        assert_eq!(
            body.as_json().unwrap()["resourceType"],
            json!("Bundle")
        );
    }

    #[test]
    fn test_invalid_json_falls_back_to_raw() {
        let body = normalize_body(Some("application/fhir+json"), "<not json>");
        assert_eq!(
            body,
            NormalizedBody::Raw {
                raw_response: "<not json>".to_string(),
                content_type: Some("application/fhir+json".to_string()),
            }
        );
    }

    #[test]
    fn test_non_json_content_type_is_raw_even_when_parseable() {
        let body = normalize_body(Some("application/xml"), r#"{"looks":"like json"}"#);
        assert!(body.as_json().is_none());
    }

    #[test]
    fn test_missing_content_type_is_raw() {
        let body = normalize_body(None, r#"{"resourceType":"Bundle"}"#);
        assert!(body.as_json().is_none());
    }

    #[test]
    fn test_raw_serializes_with_wire_field_names() {
        let body = normalize_body(Some("text/plain"), "hello");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["rawResponse"], "hello");
        assert_eq!(json["contentType"], "text/plain");
    }

    #[test]
    fn test_json_serializes_transparently() {
        let body = normalize_body(Some("application/json"), r#"{"a":1}"#);
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_expect_binary_accepts_binary_envelope() {
        let body = NormalizedBody::Json(json!({
            "resourceType": "Binary",
            "contentType": "application/pdf",
            "data": "JVBERi0=",
            "id": "doc-1"
        }));
        let payload = expect_binary(&body).unwrap();
        assert_eq!(payload.content_type, "application/pdf");
        assert_eq!(payload.data.as_deref(), Some("JVBERi0="));
        assert_eq!(payload.id.as_deref(), Some("doc-1"));
    }

    #[test]
    fn test_expect_binary_defaults_content_type() {
        let body = NormalizedBody::Json(json!({"resourceType": "Binary", "data": "AA=="}));
        let payload = expect_binary(&body).unwrap();
        assert_eq!(payload.content_type, "application/octet-stream");
    }

    #[test]
    fn test_expect_binary_rejects_other_resource_types() {
        let body = NormalizedBody::Json(json!({"resourceType": "OperationOutcome"}));
        let err = expect_binary(&body).unwrap_err();
        assert!(
            matches!(err, ClientError::UnexpectedResourceType { ref actual } if actual == "OperationOutcome")
        );
    }

    #[test]
    fn test_expect_binary_rejects_raw_bodies() {
        let body = NormalizedBody::Raw {
            raw_response: "<xml/>".to_string(),
            content_type: Some("application/xml".to_string()),
        };
        assert!(expect_binary(&body).is_err());
    }
}
