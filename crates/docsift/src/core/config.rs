//! Extraction options and their file/query loaders.
//!
//! Options can be built in code, loaded from TOML/YAML/JSON, discovered from a
//! `docsift.*` file in the working directory or any parent, or parsed from a
//! URL query string such as `summarize=true&max_length=800&sheet_name=Q1`.

use crate::{DocsiftError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options for one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    /// Truncate long output around a marker.
    #[serde(default)]
    pub summarize: bool,

    /// Character budget used when `summarize` is set.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Stop after the metadata preamble.
    #[serde(default)]
    pub metadata_only: bool,

    /// Restrict spreadsheet output to one sheet.
    #[serde(default)]
    pub sheet_name: Option<String>,

    /// Restrict spreadsheet output to an `A1:C10` style range.
    #[serde(default)]
    pub cell_range: Option<String>,

    #[serde(default)]
    pub pdf: PdfOptions,

    #[serde(default)]
    pub office: OfficeOptions,

    #[serde(default)]
    pub spreadsheet: SpreadsheetOptions,

    #[serde(default)]
    pub csv: CsvOptions,

    #[serde(default)]
    pub epub: EpubOptions,

    /// Upper bound for subprocess-backed strategies.
    #[serde(default = "default_subprocess_timeout")]
    pub subprocess_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfOptions {
    #[serde(default = "default_true")]
    pub extract_tables: bool,

    #[serde(default = "default_true")]
    pub extract_images: bool,

    /// Use tabula for tables in the structural strategy when java is present.
    #[serde(default = "default_true")]
    pub use_tabula: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeOptions {
    #[serde(default = "default_true")]
    pub extract_tables: bool,

    #[serde(default = "default_true")]
    pub extract_images: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetOptions {
    #[serde(default = "default_sheet_rows")]
    pub max_rows: usize,

    #[serde(default = "default_sheet_columns")]
    pub max_columns: usize,

    /// Fraction of non-numeric first-row cells that marks a header row.
    #[serde(default = "default_header_ratio")]
    pub header_text_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    #[serde(default = "default_true")]
    pub analyze_columns: bool,

    #[serde(default = "default_csv_rows")]
    pub max_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpubOptions {
    #[serde(default = "default_true")]
    pub extract_toc: bool,
}

fn default_true() -> bool {
    true
}
fn default_max_length() -> usize {
    500
}
fn default_subprocess_timeout() -> u64 {
    60
}
fn default_sheet_rows() -> usize {
    100
}
fn default_sheet_columns() -> usize {
    20
}
fn default_header_ratio() -> f64 {
    1.0 / 3.0
}
fn default_csv_rows() -> usize {
    2000
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            summarize: false,
            max_length: default_max_length(),
            metadata_only: false,
            sheet_name: None,
            cell_range: None,
            pdf: PdfOptions::default(),
            office: OfficeOptions::default(),
            spreadsheet: SpreadsheetOptions::default(),
            csv: CsvOptions::default(),
            epub: EpubOptions::default(),
            subprocess_timeout_secs: default_subprocess_timeout(),
        }
    }
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            extract_tables: true,
            extract_images: true,
            use_tabula: true,
        }
    }
}

impl Default for OfficeOptions {
    fn default() -> Self {
        Self {
            extract_tables: true,
            extract_images: true,
        }
    }
}

impl Default for SpreadsheetOptions {
    fn default() -> Self {
        Self {
            max_rows: default_sheet_rows(),
            max_columns: default_sheet_columns(),
            header_text_ratio: default_header_ratio(),
        }
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            analyze_columns: true,
            max_rows: default_csv_rows(),
        }
    }
}

impl Default for EpubOptions {
    fn default() -> Self {
        Self { extract_toc: true }
    }
}

/// File names probed by [`ExtractionOptions::discover`], in order.
const CONFIG_FILE_NAMES: &[&str] = &["docsift.toml", "docsift.yaml", "docsift.yml", "docsift.json"];

impl ExtractionOptions {
    /// Load options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DocsiftError::Validation` if the file is unreadable or invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| DocsiftError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load options from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| DocsiftError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| DocsiftError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load options, picking the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "toml" => Self::from_toml_file(path),
            Some(ext) if ext == "yaml" || ext == "yml" => Self::from_yaml_file(path),
            Some(ext) if ext == "json" => Self::from_json_file(path),
            _ => Err(DocsiftError::validation(format!(
                "Unsupported config format: {} (expected .toml, .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Search the current directory and its parents for a `docsift.*` file.
    ///
    /// # Returns
    ///
    /// - `Some(options)` from the nearest file found
    /// - `None` if no config file exists up to the filesystem root
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir().map_err(DocsiftError::Io)?;
        match find_config_file(&current) {
            Some(path) => Ok(Some(Self::from_file(path)?)),
            None => Ok(None),
        }
    }

    /// Build options from a URL query string on top of the defaults.
    ///
    /// Unknown keys are ignored. Booleans accept `true/false`, `1/0`, `yes/no`.
    pub fn from_query(query: &str) -> Result<Self> {
        let mut options = Self::default();
        let query = query.trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, "true"));
            let value = percent_decode(raw);
            match key {
                "summarize" => options.summarize = parse_bool(key, &value)?,
                "max_length" => options.max_length = parse_usize(key, &value)?,
                "metadata_only" => options.metadata_only = parse_bool(key, &value)?,
                "sheet_name" => options.sheet_name = Some(value),
                "cell_range" => options.cell_range = Some(value),
                "tables" => options.pdf.extract_tables = parse_bool(key, &value)?,
                "images" => options.pdf.extract_images = parse_bool(key, &value)?,
                "extract_tables" => options.office.extract_tables = parse_bool(key, &value)?,
                "extract_images" => options.office.extract_images = parse_bool(key, &value)?,
                "analyze_columns" => options.csv.analyze_columns = parse_bool(key, &value)?,
                "max_rows" => options.csv.max_rows = parse_usize(key, &value)?,
                "extract_toc" => options.epub.extract_toc = parse_bool(key, &value)?,
                other => tracing::debug!("Ignoring unknown query option '{}'", other),
            }
        }

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.summarize && self.max_length < 2 {
            return Err(DocsiftError::validation("max_length must be at least 2 when summarizing"));
        }
        if self.subprocess_timeout_secs == 0 {
            return Err(DocsiftError::validation("subprocess_timeout_secs must be positive"));
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DocsiftError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        current = dir.parent();
    }
    None
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(DocsiftError::validation(format!(
            "Invalid boolean for '{}': {}",
            key, value
        ))),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|e| DocsiftError::validation_with_source(format!("Invalid integer for '{}': {}", key, value), e))
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let options = ExtractionOptions::default();
        assert!(!options.summarize);
        assert_eq!(options.max_length, 500);
        assert!(!options.metadata_only);
        assert!(options.pdf.extract_tables && options.pdf.extract_images);
        assert_eq!(options.csv.max_rows, 2000);
        assert!(options.csv.analyze_columns);
        assert!(options.epub.extract_toc);
        assert_eq!(options.spreadsheet.max_rows, 100);
    }

    #[test]
    fn test_from_toml_file_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("opts.toml");
        fs::write(
            &path,
            r#"
summarize = true
max_length = 1200

[csv]
max_rows = 50
"#,
        )
        .unwrap();

        let options = ExtractionOptions::from_file(&path).unwrap();
        assert!(options.summarize);
        assert_eq!(options.max_length, 1200);
        assert_eq!(options.csv.max_rows, 50);
        assert!(options.csv.analyze_columns);
    }

    #[test]
    fn test_from_yaml_and_json() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("opts.yaml");
        fs::write(&yaml, "metadata_only: true\nsheet_name: Totals\n").unwrap();
        let options = ExtractionOptions::from_file(&yaml).unwrap();
        assert!(options.metadata_only);
        assert_eq!(options.sheet_name.as_deref(), Some("Totals"));

        let json = dir.path().join("opts.json");
        fs::write(&json, r#"{"pdf": {"extract_images": false}}"#).unwrap();
        let options = ExtractionOptions::from_file(&json).unwrap();
        assert!(!options.pdf.extract_images);
        assert!(options.pdf.extract_tables);
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "summarize = [").unwrap();
        let err = ExtractionOptions::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, DocsiftError::Validation { .. }));
    }

    #[test]
    fn test_unknown_config_extension() {
        let err = ExtractionOptions::from_file("options.ini").unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    #[serial]
    fn test_discover_in_parent_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("docsift.toml"), "max_length = 42\n").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&nested).unwrap();

        let result = std::panic::catch_unwind(|| {
            let options = ExtractionOptions::discover().unwrap();
            assert_eq!(options.map(|o| o.max_length), Some(42));
        });

        std::env::set_current_dir(&original_dir).unwrap();

        if let Err(e) = result {
            std::panic::resume_unwind(e);
        }
    }

    #[test]
    fn test_from_query() {
        let options =
            ExtractionOptions::from_query("?summarize=1&max_length=800&sheet_name=Q1%20Sales&cell_range=A1:C10&images=no")
                .unwrap();
        assert!(options.summarize);
        assert_eq!(options.max_length, 800);
        assert_eq!(options.sheet_name.as_deref(), Some("Q1 Sales"));
        assert_eq!(options.cell_range.as_deref(), Some("A1:C10"));
        assert!(!options.pdf.extract_images);
    }

    #[test]
    fn test_from_query_rejects_bad_values() {
        assert!(ExtractionOptions::from_query("summarize=maybe").is_err());
        assert!(ExtractionOptions::from_query("max_length=-3").is_err());
        assert!(ExtractionOptions::from_query("summarize=true&max_length=1").is_err());
    }

    #[test]
    fn test_from_query_ignores_unknown_keys() {
        let options = ExtractionOptions::from_query("colour=blue&metadata_only").unwrap();
        assert!(options.metadata_only);
    }
}
