//! Document-level facts for the `--- Document Metadata ---` section.
//!
//! Both backends fill the same [`PdfSummary`]: the pdfium reader goes through
//! the document's metadata tags, the lopdf reader through the trailer's
//! `/Info` dictionary.

use super::objects::{decode_pdf_string, resolve};
use crate::types::MetadataSection;
use lopdf::{Document as LopdfDocument, Object};
use pdfium_render::prelude::*;

/// Info dictionary keys, in output order.
pub const INFO_KEYS: [&str; 8] = [
    "Title",
    "Author",
    "Subject",
    "Keywords",
    "Creator",
    "Producer",
    "CreationDate",
    "ModDate",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfSummary {
    pub file_name: String,
    pub page_count: usize,
    /// Present info entries as `(key, value)`, in [`INFO_KEYS`] order.
    pub info: Vec<(String, String)>,
    pub version: Option<String>,
    pub encrypted: bool,
}

impl PdfSummary {
    pub fn section(&self) -> MetadataSection {
        let mut section = MetadataSection::new("--- Document Metadata ---");
        section
            .push("PDF Document", &self.file_name)
            .push("Number of pages", self.page_count);
        for (key, value) in &self.info {
            section.push(key.clone(), value);
        }
        section.push_opt("PDF Version", self.version.as_deref());
        if self.encrypted {
            section.push("Status", "Encrypted");
        }
        section
    }
}

/// Summary from a lopdf document.
pub fn summary_from_lopdf(doc: &LopdfDocument, file_name: &str) -> PdfSummary {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok());

    let info = match info {
        Some(dict) => INFO_KEYS
            .iter()
            .filter_map(|key| {
                let value = match dict.get(key.as_bytes()).ok().and_then(|o| resolve(doc, o))? {
                    Object::String(bytes, _) => decode_pdf_string(bytes),
                    Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
                    _ => return None,
                };
                let value = value.trim();
                (!value.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect(),
        None => Vec::new(),
    };

    let version = doc.version.trim();
    PdfSummary {
        file_name: file_name.to_string(),
        page_count: doc.get_pages().len(),
        info,
        version: (!version.is_empty()).then(|| version.to_string()),
        encrypted: doc.trailer.get(b"Encrypt").is_ok(),
    }
}

/// Summary from a pdfium document.
pub fn summary_from_pdfium(document: &PdfDocument<'_>, file_name: &str) -> PdfSummary {
    let metadata = document.metadata();
    let tags = [
        ("Title", PdfDocumentMetadataTagType::Title),
        ("Author", PdfDocumentMetadataTagType::Author),
        ("Subject", PdfDocumentMetadataTagType::Subject),
        ("Keywords", PdfDocumentMetadataTagType::Keywords),
        ("Creator", PdfDocumentMetadataTagType::Creator),
        ("Producer", PdfDocumentMetadataTagType::Producer),
        ("CreationDate", PdfDocumentMetadataTagType::CreationDate),
        ("ModDate", PdfDocumentMetadataTagType::ModificationDate),
    ];
    let info = tags
        .into_iter()
        .filter_map(|(key, tag)| {
            let value = metadata.get(tag)?.value().trim().to_string();
            (!value.is_empty()).then(|| (key.to_string(), value))
        })
        .collect();

    let encrypted = document
        .permissions()
        .security_handler_revision()
        .is_ok_and(|revision| revision != PdfSecurityHandlerRevision::Unprotected);

    PdfSummary {
        file_name: file_name.to_string(),
        page_count: document.pages().len() as usize,
        info,
        version: format_pdf_version(document.version()),
        encrypted,
    }
}

fn format_pdf_version(version: PdfDocumentVersion) -> Option<String> {
    match version {
        PdfDocumentVersion::Unset => None,
        PdfDocumentVersion::Pdf1_0 => Some("1.0".to_string()),
        PdfDocumentVersion::Pdf1_1 => Some("1.1".to_string()),
        PdfDocumentVersion::Pdf1_2 => Some("1.2".to_string()),
        PdfDocumentVersion::Pdf1_3 => Some("1.3".to_string()),
        PdfDocumentVersion::Pdf1_4 => Some("1.4".to_string()),
        PdfDocumentVersion::Pdf1_5 => Some("1.5".to_string()),
        PdfDocumentVersion::Pdf1_6 => Some("1.6".to_string()),
        PdfDocumentVersion::Pdf1_7 => Some("1.7".to_string()),
        PdfDocumentVersion::Pdf2_0 => Some("2.0".to_string()),
        PdfDocumentVersion::Other(value) if value >= 10 => Some(format!("{}.{}", value / 10, value % 10)),
        PdfDocumentVersion::Other(value) => Some(value.to_string()),
    }
}
