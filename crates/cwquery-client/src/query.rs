//! Query-URL construction for DocumentReference searches.
//!
//! The caller's form state arrives as a [`QueryParameters`] set; this module
//! composes it with the per-environment base URL into the upstream search
//! URL. Datetime-local inputs (`YYYY-MM-DDTHH:MM[:SS]`) are interpreted as
//! UTC so the produced instants do not depend on the server's timezone;
//! RFC 3339 inputs keep their offset and are converted.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{PrimitiveDateTime, UtcOffset};
use url::Url;

use cwquery_core::Environment;

use crate::error::ClientError;

/// DocumentReference status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentStatus {
    /// Only current documents.
    Current,
    /// Only superseded documents.
    Superseded,
    /// Only documents entered in error.
    EnteredInError,
    /// No status filter.
    All,
}

impl DocumentStatus {
    /// Returns the wire value of the filter, or `None` for `All`.
    #[must_use]
    pub fn as_filter(&self) -> Option<&'static str> {
        match self {
            Self::Current => Some("current"),
            Self::Superseded => Some("superseded"),
            Self::EnteredInError => Some("entered-in-error"),
            Self::All => None,
        }
    }
}

/// The full parameter set of one execute-query call.
///
/// Field names mirror the JSON the form client sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    /// Target environment.
    pub environment: Environment,
    /// Bearer credential for the query (a previously minted assertion).
    pub bearer_token: String,
    /// Assigning-authority id of the patient identifier.
    pub aaid: String,
    /// Local patient id under that authority.
    pub patient_id: String,
    /// Status filter.
    pub status: DocumentStatus,
    /// Whether the creation-date filter is active.
    pub date_enabled: bool,
    /// Inclusive lower creation-date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Inclusive upper creation-date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    /// Whether the service-period filter is active.
    pub period_enabled: bool,
    /// Inclusive lower period bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_from: Option<String>,
    /// Inclusive upper period bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_to: Option<String>,
    /// Whether the document-type filter is active.
    pub document_type_enabled: bool,
    /// Selected LOINC document-type codes.
    pub document_types: Vec<String>,
    /// Free-form extra document-type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_document_type: Option<String>,
    /// Whether the content-type filter is active.
    pub content_type_enabled: bool,
    /// Selected MIME content types.
    pub content_types: Vec<String>,
    /// Whether the author filter is active.
    pub author_enabled: bool,
    /// Author given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_given: Option<String>,
    /// Author family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_family: Option<String>,
}

impl QueryParameters {
    /// Composite `AAID|localId` identifier as stored in history.
    #[must_use]
    pub fn patient_identifier(&self) -> String {
        format!("{}|{}", self.aaid, self.patient_id)
    }

    /// Checks the shape constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns one message per violated constraint.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();
        if self.bearer_token.is_empty() {
            issues.push("bearerToken must not be empty".to_string());
        }
        if self.aaid.is_empty() {
            issues.push("aaid must not be empty".to_string());
        }
        if self.patient_id.is_empty() {
            issues.push("patientId must not be empty".to_string());
        }
        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }
}

/// Renders a caller-supplied datetime as a UTC instant with millisecond
/// precision (`2024-01-01T00:00:00.000Z`).
///
/// Accepts RFC 3339 (offset preserved, then converted to UTC) and the
/// datetime-local shapes `YYYY-MM-DDTHH:MM` / `YYYY-MM-DDTHH:MM:SS`, which
/// are taken as already-UTC.
///
/// # Errors
///
/// Returns [`ClientError::InvalidParameter`] for anything else.
pub fn to_utc_instant(raw: &str) -> Result<String, ClientError> {
    const OUTPUT: &[time::format_description::BorrowedFormatItem<'static>] = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    const LOCAL_WITH_SECONDS: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

    if let Ok(instant) = time::OffsetDateTime::parse(raw, &Rfc3339) {
        return instant
            .to_offset(UtcOffset::UTC)
            .format(OUTPUT)
            .map_err(|e| ClientError::invalid_parameter(format!("datetime {raw}: {e}")));
    }

    // Minutes-resolution inputs get an explicit :00 before parsing.
    let parsed = PrimitiveDateTime::parse(raw, LOCAL_WITH_SECONDS)
        .or_else(|_| PrimitiveDateTime::parse(&format!("{raw}:00"), LOCAL_WITH_SECONDS))
        .map_err(|_| {
            ClientError::invalid_parameter(format!("datetime {raw} is not an ISO 8601 value"))
        })?;

    parsed
        .assume_utc()
        .format(OUTPUT)
        .map_err(|e| ClientError::invalid_parameter(format!("datetime {raw}: {e}")))
}

/// Builds the upstream search URL from the base URL for the environment and
/// the caller's parameter set.
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] if the base URL does not parse and
/// [`ClientError::InvalidParameter`] for unusable datetime filters.
pub fn build_query_url(base_url: &str, params: &QueryParameters) -> Result<String, ClientError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ClientError::invalid_url(format!("{base_url}: {e}")))?;

    {
        let mut pairs = url.query_pairs_mut();

        if !params.aaid.is_empty() && !params.patient_id.is_empty() {
            pairs.append_pair("patient.identifier", &params.patient_identifier());
        }

        if let Some(status) = params.status.as_filter() {
            pairs.append_pair("status", status);
        }

        if params.date_enabled {
            if let Some(from) = &params.date_from {
                pairs.append_pair("date", &format!("ge{}", to_utc_instant(from)?));
            }
            if let Some(to) = &params.date_to {
                pairs.append_pair("date", &format!("le{}", to_utc_instant(to)?));
            }
        }

        if params.period_enabled {
            if let Some(from) = &params.period_from {
                pairs.append_pair("period", &format!("ge{}", to_utc_instant(from)?));
            }
            if let Some(to) = &params.period_to {
                pairs.append_pair("period", &format!("le{}", to_utc_instant(to)?));
            }
        }

        if params.document_type_enabled {
            for doc_type in &params.document_types {
                pairs.append_pair("documenttype", doc_type);
            }
            if let Some(custom) = &params.custom_document_type {
                if !custom.is_empty() {
                    pairs.append_pair("documenttype", custom);
                }
            }
        }

        if params.content_type_enabled {
            for content_type in &params.content_types {
                pairs.append_pair("contenttype", content_type);
            }
        }

        if params.author_enabled {
            if let Some(given) = &params.author_given {
                if !given.is_empty() {
                    pairs.append_pair("author.given", given);
                }
            }
            if let Some(family) = &params.author_family {
                if !family.is_empty() {
                    pairs.append_pair("author.family", family);
                }
            }
        }
    }

    // An all-defaults query carries no parameters at all; hand back the bare
    // base URL rather than a trailing '?'.
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.example.com/v2/R4/DocumentReference";

    fn params() -> QueryParameters {
        QueryParameters {
            environment: Environment::Integration,
            bearer_token: "token".to_string(),
            aaid: "A".to_string(),
            patient_id: "B".to_string(),
            status: DocumentStatus::Current,
            date_enabled: false,
            date_from: None,
            date_to: None,
            period_enabled: false,
            period_from: None,
            period_to: None,
            document_type_enabled: false,
            document_types: Vec::new(),
            custom_document_type: None,
            content_type_enabled: false,
            content_types: Vec::new(),
            author_enabled: false,
            author_given: None,
            author_family: None,
        }
    }

    fn query_pairs(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_patient_identifier_is_pipe_escaped() {
        let url = build_query_url(BASE, &params()).unwrap();
        assert!(url.contains("patient.identifier=A%7CB"), "{url}");
        assert!(url.contains("status=current"), "{url}");
    }

    #[test]
    fn test_status_all_omits_the_filter() {
        let mut p = params();
        p.status = DocumentStatus::All;
        let url = build_query_url(BASE, &p).unwrap();
        assert!(!url.contains("status="), "{url}");
    }

    #[test]
    fn test_date_bounds_become_utc_instants() {
        let mut p = params();
        p.date_enabled = true;
        p.date_from = Some("2024-01-01T00:00".to_string());
        p.date_to = Some("2024-06-30T23:59".to_string());

        let url = build_query_url(BASE, &p).unwrap();
        let pairs = query_pairs(&url);
        assert!(pairs.contains(&("date".to_string(), "ge2024-01-01T00:00:00.000Z".to_string())));
        assert!(pairs.contains(&("date".to_string(), "le2024-06-30T23:59:00.000Z".to_string())));
    }

    #[test]
    fn test_disabled_date_filter_is_ignored_even_with_values() {
        let mut p = params();
        p.date_from = Some("2024-01-01T00:00".to_string());
        let url = build_query_url(BASE, &p).unwrap();
        assert!(!url.contains("date="), "{url}");
    }

    #[test]
    fn test_period_bounds_are_repeated_values() {
        let mut p = params();
        p.period_enabled = true;
        p.period_from = Some("2023-01-01T08:30".to_string());
        p.period_to = Some("2023-12-31T17:00".to_string());

        let pairs = query_pairs(&build_query_url(BASE, &p).unwrap());
        let periods: Vec<_> = pairs.iter().filter(|(k, _)| k == "period").collect();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].1, "ge2023-01-01T08:30:00.000Z");
    }

    #[test]
    fn test_document_types_include_custom_code() {
        let mut p = params();
        p.document_type_enabled = true;
        p.document_types = vec!["34133-9".to_string(), "18842-5".to_string()];
        p.custom_document_type = Some("11506-3".to_string());

        let pairs = query_pairs(&build_query_url(BASE, &p).unwrap());
        let types: Vec<_> = pairs
            .iter()
            .filter(|(k, _)| k == "documenttype")
            .map(|(_, v)| v.clone())
            .collect();
        assert_eq!(types, vec!["34133-9", "18842-5", "11506-3"]);
    }

    #[test]
    fn test_author_names_are_separate_parameters() {
        let mut p = params();
        p.author_enabled = true;
        p.author_given = Some("Alice".to_string());
        p.author_family = Some("Smith".to_string());

        let pairs = query_pairs(&build_query_url(BASE, &p).unwrap());
        assert!(pairs.contains(&("author.given".to_string(), "Alice".to_string())));
        assert!(pairs.contains(&("author.family".to_string(), "Smith".to_string())));
    }

    #[test]
    fn test_utc_instant_accepts_rfc3339_with_offset() {
        assert_eq!(
            to_utc_instant("2024-01-01T05:00:00-05:00").unwrap(),
            "2024-01-01T10:00:00.000Z"
        );
    }

    #[test]
    fn test_utc_instant_is_timezone_stable_for_local_inputs() {
        // Naive inputs are taken as UTC no matter where the server runs.
        assert_eq!(
            to_utc_instant("2024-01-01T00:00").unwrap(),
            "2024-01-01T00:00:00.000Z"
        );
        assert_eq!(
            to_utc_instant("2024-01-01T00:00:30").unwrap(),
            "2024-01-01T00:00:30.000Z"
        );
    }

    #[test]
    fn test_unusable_datetime_is_invalid_parameter() {
        let mut p = params();
        p.date_enabled = true;
        p.date_from = Some("tomorrow".to_string());
        let err = build_query_url(BASE, &p).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameter { .. }));
    }

    #[test]
    fn test_validate_flags_empty_required_fields() {
        let mut p = params();
        p.bearer_token = String::new();
        p.aaid = String::new();
        let issues = p.validate().unwrap_err();
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_status_serde_wire_names() {
        let status: DocumentStatus = serde_json::from_str("\"entered-in-error\"").unwrap();
        assert_eq!(status, DocumentStatus::EnteredInError);
        assert_eq!(serde_json::to_string(&DocumentStatus::All).unwrap(), "\"all\"");
    }
}
