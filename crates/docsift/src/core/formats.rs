//! Extension handling and the per-extension option catalogue.

use crate::core::capabilities::Capabilities;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;

/// Extensions read as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".json", ".html", ".xml", ".log", ".py", ".js", ".css", ".java", ".ini", ".conf", ".cfg", ".yaml",
    ".yml", ".toml",
];

pub const PDF_EXTENSIONS: &[&str] = &[".pdf"];
pub const DOCX_EXTENSIONS: &[&str] = &[".docx"];
pub const XLSX_EXTENSIONS: &[&str] = &[".xlsx", ".xlsm"];
pub const LEGACY_SPREADSHEET_EXTENSIONS: &[&str] = &[".xls", ".xlsb", ".ods"];
pub const PPTX_EXTENSIONS: &[&str] = &[".pptx"];
pub const CSV_EXTENSIONS: &[&str] = &[".csv", ".tsv"];
pub const EPUB_EXTENSIONS: &[&str] = &[".epub"];
pub const RTF_EXTENSIONS: &[&str] = &[".rtf"];

/// Lowercase extension with a leading dot, or an empty string.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Description of one accepted option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub default: Value,
    /// Present when the option depends on an optional backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl OptionSpec {
    fn new(kind: &str, description: &str, default: Value) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.to_string(),
            default,
            available: None,
        }
    }

    fn available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }
}

/// Options accepted for files with `extension`, with defaults.
///
/// Every extension accepts `summarize` and `max_length`.
pub fn extraction_options_for(extension: &str, capabilities: &Capabilities) -> IndexMap<String, OptionSpec> {
    let ext = extension.to_ascii_lowercase();
    let mut options = IndexMap::new();
    options.insert(
        "summarize".to_string(),
        OptionSpec::new("boolean", "Summarize large content", json!(false)),
    );
    options.insert(
        "max_length".to_string(),
        OptionSpec::new("integer", "Maximum length for summarization", json!(500)),
    );

    let metadata_only = OptionSpec::new("boolean", "Extract only document metadata", json!(false));

    match ext.as_str() {
        ".pdf" => {
            options.insert(
                "tables".to_string(),
                OptionSpec::new("boolean", "Extract tables from PDF", json!(true)).available(capabilities.pdf),
            );
            options.insert(
                "images".to_string(),
                OptionSpec::new("boolean", "Extract image information", json!(true)).available(capabilities.pdfium),
            );
            options.insert("metadata_only".to_string(), metadata_only);
        }
        ".docx" | ".xlsx" | ".xlsm" | ".pptx" => {
            options.insert(
                "extract_tables".to_string(),
                OptionSpec::new("boolean", "Extract tables from document", json!(true)),
            );
            options.insert(
                "extract_images".to_string(),
                OptionSpec::new("boolean", "Extract image information", json!(true)).available(capabilities.office),
            );
            options.insert("metadata_only".to_string(), metadata_only);
            if ext.starts_with(".xls") {
                options.insert(
                    "sheet_name".to_string(),
                    OptionSpec::new("string", "Only extract this sheet", Value::Null),
                );
                options.insert(
                    "cell_range".to_string(),
                    OptionSpec::new("string", "Only extract this range, e.g. A1:C10", Value::Null),
                );
            }
        }
        ".xls" | ".xlsb" | ".ods" => {
            options.insert(
                "sheet_name".to_string(),
                OptionSpec::new("string", "Only extract this sheet", Value::Null).available(capabilities.excel),
            );
            options.insert(
                "cell_range".to_string(),
                OptionSpec::new("string", "Only extract this range, e.g. A1:C10", Value::Null),
            );
        }
        ".epub" => {
            options.insert("metadata_only".to_string(), metadata_only.available(capabilities.office));
            options.insert(
                "extract_toc".to_string(),
                OptionSpec::new("boolean", "Extract table of contents", json!(true)).available(capabilities.office),
            );
        }
        ".csv" | ".tsv" => {
            options.insert(
                "analyze_columns".to_string(),
                OptionSpec::new("boolean", "Analyze column data types", json!(true)),
            );
            options.insert(
                "max_rows".to_string(),
                OptionSpec::new("integer", "Maximum number of rows to extract", json!(2000)),
            );
        }
        _ => {}
    }

    options
}
