//! Public extraction entry points.
//!
//! Async functions run on the caller's runtime. The `_sync` wrappers drive a
//! lazily built process-wide runtime.

use crate::core::config::ExtractionOptions;
use crate::core::dispatcher::Dispatcher;
use crate::types::ExtractionResult;
use once_cell::sync::Lazy;
use std::path::Path;

static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Extract one file with the built-in strategies.
///
/// Always returns a result record; check `success` before reading `content`.
///
/// # Example
///
/// ```rust,no_run
/// use docsift::{extract_file, ExtractionOptions};
///
/// # async fn example() {
/// let result = extract_file("report.pdf", &ExtractionOptions::default()).await;
/// if result.success {
///     println!("{}", result.content.unwrap_or_default());
/// }
/// # }
/// ```
pub async fn extract_file(path: impl AsRef<Path>, options: &ExtractionOptions) -> ExtractionResult {
    Dispatcher::global().extract(path, options).await
}

/// Extract several files one after another, preserving input order.
pub async fn extract_files(paths: &[impl AsRef<Path>], options: &ExtractionOptions) -> Vec<ExtractionResult> {
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        results.push(extract_file(path, options).await);
    }
    results
}

/// Synchronous wrapper for [`extract_file`].
pub fn extract_file_sync(path: impl AsRef<Path>, options: &ExtractionOptions) -> ExtractionResult {
    GLOBAL_RUNTIME.block_on(extract_file(path, options))
}
