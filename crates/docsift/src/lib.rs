//! docsift - reading-order text from heterogeneous documents.
//!
//! docsift turns PDF, DOCX, XLSX/XLS/ODS, PPTX, CSV, EPUB, RTF and plain-text
//! files into one normalized text stream that keeps the top-to-bottom,
//! left-to-right order of prose, tables and embedded objects.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docsift::{extract_file_sync, ExtractionOptions};
//!
//! let result = extract_file_sync("quarterly.xlsx", &ExtractionOptions::default());
//! if result.success {
//!     println!("{}", result.content.unwrap_or_default());
//! } else {
//!     eprintln!("{}", result.error.unwrap_or_default());
//! }
//! ```
//!
//! # Architecture
//!
//! - **Dispatcher** (`core::dispatcher`): extension lookup, result boundary
//! - **Fallback chain** (`core::chain`): ordered strategies per format
//! - **Strategies** (`extractors`): one per backend, producing a [`Document`]
//! - **Rendering** (`render`): spatial ordering, tables, metadata sections

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extraction;
pub mod extractors;
pub mod plugins;
pub mod render;
pub mod types;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use error::{DocsiftError, Result};
pub use types::*;

pub use core::capabilities::Capabilities;
pub use core::config::{CsvOptions, EpubOptions, ExtractionOptions, OfficeOptions, PdfOptions, SpreadsheetOptions};
pub use core::dispatcher::Dispatcher;
pub use core::extractor::{extract_file, extract_file_sync, extract_files};
pub use core::file_info::{FileInfo, file_info};
pub use core::formats::{OptionSpec, extraction_options_for};
pub use core::summarize::summarize;
