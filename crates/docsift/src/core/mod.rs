//! Core extraction orchestration.
//!
//! - [`dispatcher`]: extension lookup and the result boundary
//! - [`chain`]: the fallback loop shared by every format
//! - [`config`]: options and their loaders
//! - [`capabilities`]: probed backend availability

pub mod capabilities;
pub mod chain;
pub mod config;
pub mod dispatcher;
pub mod extractor;
pub mod file_info;
pub mod formats;
pub mod io;
pub mod summarize;

pub use capabilities::Capabilities;
pub use config::{CsvOptions, EpubOptions, ExtractionOptions, OfficeOptions, PdfOptions, SpreadsheetOptions};
pub use dispatcher::Dispatcher;
pub use extractor::{extract_file, extract_file_sync, extract_files};
