//! Extraction strategy trait.
//!
//! A strategy is one backend's way of turning a file into a [`Document`]. Formats
//! with several backends register several strategies; the fallback chain tries
//! them by descending priority.

use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::plugins::Plugin;
use crate::types::Document;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// One backend-specific way of extracting a format.
///
/// Returning `Err` is a hard failure and advances the chain. Returning `Ok` is
/// final, even when the document is sparse.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use docsift::plugins::{ExtractionStrategy, Plugin};
/// use docsift::{Capabilities, Document, ExtractionOptions, Result};
/// use std::path::Path;
///
/// struct Notes;
///
/// impl Plugin for Notes {
///     fn name(&self) -> &str { "notes" }
///     fn version(&self) -> String { "1.0.0".to_string() }
///     fn initialize(&self) -> Result<()> { Ok(()) }
///     fn shutdown(&self) -> Result<()> { Ok(()) }
/// }
///
/// #[async_trait]
/// impl ExtractionStrategy for Notes {
///     fn supported_extensions(&self) -> &[&str] {
///         &[".notes"]
///     }
///
///     async fn extract(&self, _path: &Path, _options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
///         Ok(Document::new())
///     }
/// }
/// ```
#[async_trait]
pub trait ExtractionStrategy: Plugin {
    /// Lowercase extensions with a leading dot.
    fn supported_extensions(&self) -> &[&str];

    /// Higher runs first within one extension's chain.
    fn priority(&self) -> i32 {
        50
    }

    /// Whether this strategy can run at all given the probed backends.
    ///
    /// Unavailable strategies are skipped without counting as a failure.
    fn is_available(&self, _capabilities: &Capabilities) -> bool {
        true
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, capabilities: &Capabilities) -> Result<Document>;
}
