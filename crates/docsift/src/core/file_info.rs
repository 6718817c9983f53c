//! File facts without extraction: size, MIME type, strategy chain, options.

use crate::core::dispatcher::Dispatcher;
use crate::core::formats::{OptionSpec, extraction_options_for, file_extension};
use crate::core::io::{display_name, size_human, validate_file_exists};
use crate::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub size_human: String,
    pub mime_type: String,
    /// Last modification time, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// A registered strategy handles this extension.
    pub supported: bool,
    /// Strategies that would run, in fallback order.
    pub strategies: Vec<String>,
    pub options: IndexMap<String, OptionSpec>,
}

/// Describe `path` as `dispatcher` would handle it.
///
/// # Errors
///
/// `NotFound` when the path is not a regular file, `Io` when its metadata
/// cannot be read.
pub fn file_info(path: impl AsRef<Path>, dispatcher: &Dispatcher) -> Result<FileInfo> {
    let path = path.as_ref();
    validate_file_exists(path)?;

    let metadata = std::fs::metadata(path)?;
    let extension = file_extension(path);
    let modified = metadata
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(FileInfo {
        path: path.display().to_string(),
        name: display_name(path),
        size: metadata.len(),
        size_human: size_human(metadata.len()),
        mime_type,
        modified,
        supported: dispatcher.registry().supports(&extension),
        strategies: dispatcher.chain_names(&extension),
        options: extraction_options_for(&extension, dispatcher.capabilities()),
        extension,
    })
}
