//! Built-in extraction strategies.
//!
//! Each module exposes one strategy per backend. Formats with more than one
//! backend register them at descending priorities; see
//! [`register_default_strategies`] for the resulting chains.

use crate::plugins::StrategyRegistry;
use crate::{DocsiftError, Result};
use std::sync::Arc;

/// `Plugin` impl shared by every built-in strategy.
macro_rules! builtin_plugin {
    ($ty:ty, $name:expr, $description:expr) => {
        impl $crate::plugins::Plugin for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> String {
                env!("CARGO_PKG_VERSION").to_string()
            }

            fn initialize(&self) -> $crate::Result<()> {
                Ok(())
            }

            fn shutdown(&self) -> $crate::Result<()> {
                Ok(())
            }

            fn description(&self) -> &str {
                $description
            }
        }
    };
}

pub mod csv;
pub mod text;

#[cfg(feature = "office")]
pub mod docx;

#[cfg(feature = "office")]
pub mod epub;

#[cfg(feature = "office")]
pub mod pptx;

#[cfg(feature = "office")]
pub mod rtf;

#[cfg(feature = "office")]
pub mod xlsx;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use self::csv::CsvStrategy;
pub use text::PlainTextStrategy;

#[cfg(feature = "office")]
pub use docx::{DocxLiteStrategy, DocxNativeStrategy};

#[cfg(feature = "office")]
pub use epub::EpubStrategy;

#[cfg(feature = "office")]
pub use pptx::PptxNativeStrategy;

#[cfg(feature = "office")]
pub use rtf::{RtfNativeStrategy, RtfParserStrategy};

#[cfg(feature = "office")]
pub use xlsx::XlsxNativeStrategy;

#[cfg(feature = "excel")]
pub use xlsx::CalamineStrategy;

#[cfg(feature = "pdf")]
pub use pdf::{PdfLayoutStrategy, PdfMinimalStrategy, PdfStructuralStrategy};

/// Priority of the preferred backend of a format.
pub const PRIMARY: i32 = 70;
/// Priority of the first fallback.
pub const SECONDARY: i32 = 50;
/// Priority of the last-resort backend.
pub const LAST_RESORT: i32 = 30;

/// Register every strategy compiled into this build.
///
/// | Format | Chain |
/// |---|---|
/// | PDF | `pdf-layout` → `pdf-structural` → `pdf-minimal` |
/// | DOCX | `docx-native` → `docx-lite` |
/// | XLSX/XLSM | `xlsx-native` → `calamine` |
/// | XLS/XLSB/ODS | `calamine` |
/// | PPTX | `pptx-native` |
/// | CSV/TSV | `csv` |
/// | EPUB | `epub` |
/// | RTF | `rtf-parser` → `rtf-native` |
/// | text family | `text` |
pub fn register_default_strategies(registry: &mut StrategyRegistry) -> Result<()> {
    registry.register(Arc::new(PlainTextStrategy::new()))?;
    registry.register(Arc::new(CsvStrategy::new()))?;

    #[cfg(feature = "office")]
    {
        registry.register(Arc::new(DocxNativeStrategy::new()))?;
        registry.register(Arc::new(DocxLiteStrategy::new()))?;
        registry.register(Arc::new(XlsxNativeStrategy::new()))?;
        registry.register(Arc::new(PptxNativeStrategy::new()))?;
        registry.register(Arc::new(EpubStrategy::new()))?;
        registry.register(Arc::new(RtfParserStrategy::new()))?;
        registry.register(Arc::new(RtfNativeStrategy::new()))?;
    }

    #[cfg(feature = "excel")]
    registry.register(Arc::new(CalamineStrategy::new()))?;

    #[cfg(feature = "pdf")]
    {
        registry.register(Arc::new(PdfLayoutStrategy::new()))?;
        registry.register(Arc::new(PdfStructuralStrategy::new()))?;
        registry.register(Arc::new(PdfMinimalStrategy::new()))?;
    }

    tracing::debug!(extensions = registry.extensions().len(), "Registered built-in strategies");
    Ok(())
}

/// Run a synchronous backend on the blocking pool.
///
/// Backend errors are wrapped as `Backend { strategy }` so the chain reports
/// which strategy failed; a panicking backend becomes an ordinary failure.
pub(crate) async fn run_blocking<T, F>(strategy: &'static str, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let span = tracing::Span::current();
    let joined = tokio::task::spawn_blocking(move || {
        let _guard = span.entered();
        job()
    })
    .await;

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err @ DocsiftError::Backend { .. })) => Err(err),
        Ok(Err(err)) => Err(DocsiftError::Backend {
            strategy: strategy.to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }),
        Err(join_err) if join_err.is_panic() => Err(DocsiftError::backend(strategy, "backend panicked")),
        Err(join_err) => Err(DocsiftError::backend(strategy, format!("task failed: {}", join_err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains() {
        let registry = StrategyRegistry::with_defaults().unwrap();
        let names = |ext: &str| -> Vec<String> { registry.chain(ext).iter().map(|s| s.name().to_string()).collect() };

        assert_eq!(names(".txt"), vec!["text"]);
        assert_eq!(names(".csv"), vec!["csv"]);
        assert_eq!(names(".TSV"), vec!["csv"]);

        #[cfg(feature = "office")]
        {
            assert_eq!(names(".docx"), vec!["docx-native", "docx-lite"]);
            assert_eq!(names(".rtf"), vec!["rtf-parser", "rtf-native"]);
            assert_eq!(names(".pptx"), vec!["pptx-native"]);
            assert_eq!(names(".epub"), vec!["epub"]);
        }

        #[cfg(feature = "excel")]
        {
            assert_eq!(names(".xlsx"), vec!["xlsx-native", "calamine"]);
            assert_eq!(names(".ods"), vec!["calamine"]);
        }

        #[cfg(feature = "pdf")]
        assert_eq!(names(".pdf"), vec!["pdf-layout", "pdf-structural", "pdf-minimal"]);
    }

    #[tokio::test]
    async fn test_run_blocking_wraps_errors() {
        let err = run_blocking::<(), _>("demo", || Err(DocsiftError::parsing("bad header")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "demo failed: Parsing error: bad header");
    }

    #[tokio::test]
    async fn test_run_blocking_contains_panics() {
        let err = run_blocking::<(), _>("demo", || panic!("boom")).await.unwrap_err();
        assert_eq!(err.to_string(), "demo failed: backend panicked");
    }
}
