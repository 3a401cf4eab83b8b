//! Reference catalogs for query building.
//!
//! The document-type catalog carries the LOINC codes commonly requested from
//! the exchange; the content-type catalog carries the MIME types documents
//! come back in. Both are served to clients verbatim.

use serde::Serialize;

/// A LOINC document-type code with display metadata.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DocumentTypeCode {
    /// LOINC code.
    pub code: &'static str,
    /// Short display name.
    pub name: &'static str,
    /// Longer description.
    pub description: &'static str,
}

/// A MIME content type with display metadata.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeCode {
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: &'static str,
    /// Short display name.
    pub name: &'static str,
    /// Longer description.
    pub description: &'static str,
}

/// LOINC codes for the document types the harness queries for.
pub const LOINC_DOCUMENT_TYPES: &[DocumentTypeCode] = &[
    DocumentTypeCode {
        code: "34133-9",
        name: "Summarization of Episode Note (CCD)",
        description: "Continuity of Care Document",
    },
    DocumentTypeCode {
        code: "18842-5",
        name: "Discharge Summary",
        description: "Hospital discharge documentation",
    },
    DocumentTypeCode {
        code: "11506-3",
        name: "Progress Note",
        description: "Clinical progress/visit notes",
    },
    DocumentTypeCode {
        code: "34117-2",
        name: "History and Physical",
        description: "H&P documentation",
    },
    DocumentTypeCode {
        code: "11488-4",
        name: "Consultation Note",
        description: "Specialist consultation reports",
    },
    DocumentTypeCode {
        code: "28570-0",
        name: "Procedure Note",
        description: "Surgical/procedural documentation",
    },
    DocumentTypeCode {
        code: "57133-1",
        name: "Referral Note",
        description: "Referral documentation",
    },
    DocumentTypeCode {
        code: "57016-8",
        name: "Privacy Policy Acknowledgement",
        description: "Consent/privacy documents",
    },
];

/// MIME types clinical documents are delivered in.
pub const CONTENT_TYPES: &[ContentTypeCode] = &[
    ContentTypeCode {
        mime_type: "application/xml",
        name: "C-CDA XML Documents",
        description: "Most common clinical format",
    },
    ContentTypeCode {
        mime_type: "text/xml",
        name: "XML (alternative)",
        description: "Alternative XML content type",
    },
    ContentTypeCode {
        mime_type: "application/pdf",
        name: "PDF Documents",
        description: "Scanned records, reports",
    },
    ContentTypeCode {
        mime_type: "text/plain",
        name: "Plain Text",
        description: "Plain text documents",
    },
    ContentTypeCode {
        mime_type: "application/dicom",
        name: "DICOM Images",
        description: "Imaging studies",
    },
    ContentTypeCode {
        mime_type: "image/jpeg",
        name: "JPEG Images",
        description: "JPEG image files",
    },
    ContentTypeCode {
        mime_type: "image/png",
        name: "PNG Images",
        description: "PNG image files",
    },
    ContentTypeCode {
        mime_type: "image/tiff",
        name: "TIFF Images",
        description: "Often scanned documents",
    },
    ContentTypeCode {
        mime_type: "application/x-hl7",
        name: "HL7 v2 Messages",
        description: "HL7 v2 format",
    },
];
