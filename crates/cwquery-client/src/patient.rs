//! Patient registration wire format.
//!
//! Maps identity claims plus the caller's two local identifiers into the
//! document the upstream registration endpoint expects: a primary record
//! carrying both identifiers and full demographics, and one alternate
//! sub-record carrying only the externally issued identifier. Pure and
//! deterministic; optional upstream fields are omitted when the source
//! claim is absent, never emitted as null.

use serde::Serialize;

use cwquery_auth::claims::{ClaimsAddress, IdentityClaims};

/// Assigner display name for the externally issued identifier.
const IDENTITY_ASSIGNER: &str = "CLEAR";

/// Identity-assurance level tag on the externally issued identifier.
const IDENTITY_ASSURANCE: &str = "IAL2";

/// One entry of a patient identifier array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientIdentifier {
    /// Identifier value.
    pub value: String,
    /// Assigning system (an AAID or OID).
    pub system: String,
    /// Identifier use code.
    #[serde(rename = "use")]
    pub use_: &'static str,
    /// Identifier type, present only on the externally issued entry.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<&'static str>,
    /// Assigner display name.
    pub assigner: String,
}

/// One entry of a patient name array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientName {
    /// Given names, given-then-middle order.
    pub given: Vec<String>,
    /// Family names.
    pub family: Vec<String>,
    /// Full display text, present on the primary record only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Name use code.
    #[serde(rename = "use")]
    pub use_: &'static str,
}

/// One entry of a patient address array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAddress {
    /// Street lines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,
    /// City.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Address use code (`home` or `old`).
    #[serde(rename = "use")]
    pub use_: &'static str,
    /// Address type, present on historical entries only.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<&'static str>,
}

/// One entry of a patient telecom array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientTelecom {
    /// Digits-only phone number.
    pub value: String,
    /// Contact system.
    pub system: &'static str,
    /// Contact use code.
    #[serde(rename = "use")]
    pub use_: &'static str,
}

/// The alternate sub-record: externally issued identifier plus
/// demographics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternatePatient {
    /// Externally issued identifier only.
    pub identifier: Vec<PatientIdentifier>,
    /// Name entries.
    pub name: Vec<PatientName>,
    /// Birth date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    /// Gender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Current address only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Vec<PatientAddress>>,
    /// Telecom, present only when the phone claim is verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telecom: Option<Vec<PatientTelecom>>,
}

/// The patient registration document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResource {
    /// Primary identifier pair: local id plus externally issued id.
    pub identifier: Vec<PatientIdentifier>,
    /// Name entries.
    pub name: Vec<PatientName>,
    /// Birth date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    /// Always true on registration.
    pub active: bool,
    /// Gender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Current address first, historical entries after.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Vec<PatientAddress>>,
    /// Telecom, present whenever a phone claim exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telecom: Option<Vec<PatientTelecom>>,
    /// Alternate sub-records.
    pub alternate_patients: Vec<AlternatePatient>,
}

/// Builds the registration document from identity claims and the caller's
/// local identifiers.
#[must_use]
pub fn build_patient_resource(
    claims: &IdentityClaims,
    local_patient_id: &str,
    local_aaid: &str,
    org_name: &str,
    identity_issuer_oid: &str,
) -> PatientResource {
    let external_identifier = PatientIdentifier {
        value: claims.sub.clone().unwrap_or_default(),
        system: identity_issuer_oid.to_string(),
        use_: "secondary",
        type_: Some(IDENTITY_ASSURANCE),
        assigner: IDENTITY_ASSIGNER.to_string(),
    };

    let identifier = vec![
        PatientIdentifier {
            value: local_patient_id.to_string(),
            system: local_aaid.to_string(),
            use_: "official",
            type_: None,
            assigner: org_name.to_string(),
        },
        external_identifier.clone(),
    ];

    let telecom = claims.phone_number.as_deref().map(|phone| {
        vec![PatientTelecom {
            value: normalize_phone(phone),
            system: "phone",
            use_: "home",
        }]
    });

    let verified_telecom = match claims.phone_number_verified {
        Some(true) => telecom.clone(),
        _ => None,
    };

    let current_address = claims.address.as_ref().map(|addr| home_address(addr, true));

    let mut addresses: Vec<PatientAddress> = current_address.clone().into_iter().collect();
    if let Some(historical) = &claims.historical_address {
        addresses.extend(historical.iter().map(old_address));
    }

    PatientResource {
        identifier,
        name: vec![primary_name(claims)],
        birth_date: claims.birthdate.clone(),
        active: true,
        gender: claims.gender.clone(),
        address: if addresses.is_empty() { None } else { Some(addresses) },
        telecom,
        alternate_patients: vec![AlternatePatient {
            identifier: vec![external_identifier],
            name: vec![alternate_name(claims)],
            birth_date: claims.birthdate.clone(),
            gender: claims.gender.clone(),
            address: current_address.map(|addr| {
                vec![PatientAddress {
                    country: None,
                    ..addr
                }]
            }),
            telecom: verified_telecom,
        }],
    }
}

/// Given names in given-then-middle order; either may be absent.
fn given_names(claims: &IdentityClaims) -> Vec<String> {
    let mut given: Vec<String> = claims.given_name.clone().into_iter().collect();
    if let Some(middle) = &claims.middle_name {
        given.push(middle.clone());
    }
    given
}

fn primary_name(claims: &IdentityClaims) -> PatientName {
    let text = [
        claims.given_name.as_deref(),
        claims.middle_name.as_deref(),
        claims.family_name.as_deref(),
    ]
    .iter()
    .flatten()
    .copied()
    .collect::<Vec<_>>()
    .join(" ");

    PatientName {
        given: given_names(claims),
        family: claims.family_name.clone().into_iter().collect(),
        text: if text.is_empty() { None } else { Some(text) },
        use_: "usual",
    }
}

fn alternate_name(claims: &IdentityClaims) -> PatientName {
    PatientName {
        given: given_names(claims),
        family: claims.family_name.clone().into_iter().collect(),
        text: None,
        use_: "usual",
    }
}

fn home_address(addr: &ClaimsAddress, with_country: bool) -> PatientAddress {
    PatientAddress {
        line: addr.street_address.clone().into_iter().collect(),
        city: addr.locality.clone(),
        state: addr.region.clone(),
        postal_code: addr.postal_code.clone(),
        country: if with_country {
            Some(addr.country.clone().unwrap_or_else(|| "US".to_string()))
        } else {
            None
        },
        use_: "home",
        type_: None,
    }
}

fn old_address(addr: &ClaimsAddress) -> PatientAddress {
    PatientAddress {
        line: addr.street_address.clone().into_iter().collect(),
        city: addr.locality.clone(),
        state: addr.region.clone(),
        postal_code: addr.postal_code.clone(),
        country: Some(addr.country.clone().unwrap_or_else(|| "US".to_string())),
        use_: "old",
        type_: Some("both"),
    }
}

/// Strips a `+1` country prefix and every non-digit character.
fn normalize_phone(phone: &str) -> String {
    phone
        .strip_prefix("+1")
        .unwrap_or(phone)
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG_NAME: &str = "Example Health";
    const ISSUER_OID: &str = "2.16.840.1.113883.3.5958.1000.300.1";
    const LOCAL_AAID: &str = "2.16.840.1.113883.3.CVS";

    fn claims() -> IdentityClaims {
        IdentityClaims {
            sub: Some("subject-1".to_string()),
            given_name: Some("Jane".to_string()),
            family_name: Some("Doe".to_string()),
            birthdate: Some("1980-04-02".to_string()),
            ..Default::default()
        }
    }

    fn build(claims: &IdentityClaims) -> PatientResource {
        build_patient_resource(claims, "601", LOCAL_AAID, ORG_NAME, ISSUER_OID)
    }

    #[test]
    fn test_primary_identifier_pair() {
        let patient = build(&claims());

        assert_eq!(patient.identifier.len(), 2);
        assert_eq!(patient.identifier[0].value, "601");
        assert_eq!(patient.identifier[0].system, LOCAL_AAID);
        assert_eq!(patient.identifier[0].use_, "official");
        assert_eq!(patient.identifier[0].assigner, ORG_NAME);

        assert_eq!(patient.identifier[1].value, "subject-1");
        assert_eq!(patient.identifier[1].system, ISSUER_OID);
        assert_eq!(patient.identifier[1].use_, "secondary");
        assert_eq!(patient.identifier[1].type_, Some("IAL2"));
    }

    #[test]
    fn test_name_array_shape() {
        let patient = build(&claims());
        assert_eq!(patient.name[0].given, vec!["Jane"]);
        assert_eq!(patient.name[0].family, vec!["Doe"]);
        assert_eq!(patient.name[0].text.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_middle_name_appends_after_given() {
        let mut c = claims();
        c.middle_name = Some("Q".to_string());
        let patient = build(&c);
        assert_eq!(patient.name[0].given, vec!["Jane", "Q"]);
        assert_eq!(patient.name[0].text.as_deref(), Some("Jane Q Doe"));
    }

    #[test]
    fn test_unverified_phone_stays_off_the_alternate_record() {
        let mut c = claims();
        c.phone_number = Some("+15551234567".to_string());
        c.phone_number_verified = Some(false);

        let patient = build(&c);
        let primary_telecom = patient.telecom.as_ref().unwrap();
        assert_eq!(primary_telecom[0].value, "5551234567");
        assert!(patient.alternate_patients[0].telecom.is_none());
    }

    #[test]
    fn test_verified_phone_reaches_both_records() {
        let mut c = claims();
        c.phone_number = Some("+15551234567".to_string());
        c.phone_number_verified = Some(true);

        let patient = build(&c);
        assert!(patient.telecom.is_some());
        let alt = patient.alternate_patients[0].telecom.as_ref().unwrap();
        assert_eq!(alt[0].value, "5551234567");
    }

    #[test]
    fn test_absent_optionals_are_omitted_not_null() {
        let patient = build(&claims());
        let json = serde_json::to_value(&patient).unwrap();

        assert!(json.get("gender").is_none());
        assert!(json.get("address").is_none());
        assert!(json.get("telecom").is_none());
        assert_eq!(json["active"], true);
        assert_eq!(json["birthDate"], "1980-04-02");
        assert!(json["alternatePatients"][0].get("gender").is_none());
    }

    #[test]
    fn test_historical_addresses_append_as_old_entries() {
        let mut c = claims();
        c.address = Some(ClaimsAddress {
            street_address: Some("1 Main St".to_string()),
            locality: Some("Springfield".to_string()),
            region: Some("IL".to_string()),
            postal_code: Some("62704".to_string()),
            country: None,
        });
        c.historical_address = Some(vec![ClaimsAddress {
            street_address: Some("9 Elm St".to_string()),
            locality: Some("Shelbyville".to_string()),
            region: Some("IL".to_string()),
            postal_code: Some("62565".to_string()),
            country: Some("US".to_string()),
        }]);

        let patient = build(&c);
        let addresses = patient.address.as_ref().unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].use_, "home");
        assert_eq!(addresses[0].country.as_deref(), Some("US"));
        assert_eq!(addresses[1].use_, "old");
        assert_eq!(addresses[1].type_, Some("both"));

        // The alternate record keeps only the current address, without a
        // country.
        let alt_addresses = patient.alternate_patients[0].address.as_ref().unwrap();
        assert_eq!(alt_addresses.len(), 1);
        assert!(alt_addresses[0].country.is_none());
    }

    #[test]
    fn test_builder_is_deterministic() {
        let c = claims();
        assert_eq!(build(&c), build(&c));
    }
}
