//! Format dispatch: the boundary between callers and the extraction pipeline.
//!
//! `Dispatcher::extract` always returns an [`ExtractionResult`]. Errors and
//! panics inside strategies are converted to `success = false` here.

use crate::core::capabilities::Capabilities;
use crate::core::chain::run_chain;
use crate::core::config::ExtractionOptions;
use crate::core::formats::file_extension;
use crate::core::io::validate_file_exists;
use crate::core::summarize::summarize;
use crate::extractors::text::PlainTextStrategy;
use crate::plugins::{ExtractionStrategy, StrategyRegistry};
use crate::render::render_document;
use crate::types::{Document, ExtractionResult};
use crate::{DocsiftError, Result};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static GLOBAL_DISPATCHER: Lazy<Dispatcher> = Lazy::new(|| {
    let registry = StrategyRegistry::with_defaults().unwrap_or_else(|e| {
        tracing::error!("Failed to register built-in strategies: {}", e);
        StrategyRegistry::new()
    });
    Dispatcher::new(registry, Capabilities::global().clone())
});

/// Selects strategies by extension and wraps the outcome into a result record.
pub struct Dispatcher {
    registry: Arc<StrategyRegistry>,
    capabilities: Capabilities,
}

impl Dispatcher {
    pub fn new(registry: StrategyRegistry, capabilities: Capabilities) -> Self {
        Self {
            registry: Arc::new(registry),
            capabilities,
        }
    }

    /// Dispatcher with built-in strategies and process-wide capabilities.
    pub fn global() -> &'static Dispatcher {
        &GLOBAL_DISPATCHER
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Strategy names tried for `extension`, in order.
    pub fn chain_names(&self, extension: &str) -> Vec<String> {
        self.registry
            .chain(extension)
            .iter()
            .filter(|s| s.is_available(&self.capabilities))
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Extract `path` into a result record. Never fails.
    #[tracing::instrument(skip(self, path, options), fields(path = %path.as_ref().display()))]
    pub async fn extract(&self, path: impl AsRef<Path>, options: &ExtractionOptions) -> ExtractionResult {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let file_type = file_extension(path);

        match self.extract_document(path, &file_type, options).await {
            Ok(document) => {
                let content = render_document(&document);
                let mut result = ExtractionResult::success(file_path, file_type, content);
                if options.summarize
                    && let Some(content) = result.content.take()
                {
                    let (content, summarized) = summarize(&content, options.max_length);
                    result.content = Some(content);
                    result.summarized = summarized;
                }
                result
            }
            Err(err) => {
                tracing::debug!(error = %err, "Extraction failed");
                ExtractionResult::failure(file_path, file_type, err.to_string())
            }
        }
    }

    /// Extract `path` into the block model without rendering.
    pub async fn extract_document(
        &self,
        path: &Path,
        extension: &str,
        options: &ExtractionOptions,
    ) -> Result<Document> {
        validate_file_exists(path)?;
        options.validate()?;

        let chain = self.registry.chain(extension);
        if chain.is_empty() {
            tracing::debug!(extension, "No strategy registered, trying plain text");
            let fallback: Vec<Arc<dyn ExtractionStrategy>> = vec![Arc::new(PlainTextStrategy::strict())];
            return self
                .run_isolated(fallback, path, options)
                .await
                .map_err(|_| DocsiftError::unsupported(extension));
        }

        self.run_isolated(chain, path, options).await
    }

    /// Run a chain on its own task so a panicking backend cannot unwind
    /// through the caller.
    async fn run_isolated(
        &self,
        chain: Vec<Arc<dyn ExtractionStrategy>>,
        path: &Path,
        options: &ExtractionOptions,
    ) -> Result<Document> {
        let path: PathBuf = path.to_path_buf();
        let options = options.clone();
        let capabilities = self.capabilities.clone();

        let handle = tokio::spawn(async move { run_chain(&chain, &path, &options, &capabilities).await });
        match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                tracing::error!("Extraction strategy panicked");
                Err(DocsiftError::Other("extraction backend panicked".to_string()))
            }
            Err(join_err) => Err(DocsiftError::Other(format!("extraction task failed: {}", join_err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::Plugin;
    use crate::types::{ContentBlock, Unit, UnitKind};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    struct Panicky;

    impl Plugin for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }
        fn version(&self) -> String {
            "1.0.0".to_string()
        }
        fn initialize(&self) -> Result<()> {
            Ok(())
        }
        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ExtractionStrategy for Panicky {
        fn supported_extensions(&self) -> &[&str] {
            &[".boom"]
        }
        async fn extract(&self, _: &Path, _: &ExtractionOptions, _: &Capabilities) -> Result<Document> {
            panic!("backend bug");
        }
    }

    struct Long;

    impl Plugin for Long {
        fn name(&self) -> &str {
            "long"
        }
        fn version(&self) -> String {
            "1.0.0".to_string()
        }
        fn initialize(&self) -> Result<()> {
            Ok(())
        }
        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ExtractionStrategy for Long {
        fn supported_extensions(&self) -> &[&str] {
            &[".long"]
        }
        async fn extract(&self, _: &Path, _: &ExtractionOptions, _: &Capabilities) -> Result<Document> {
            let mut unit = Unit::new(UnitKind::Body, 1, "");
            unit.push(ContentBlock::text("x".repeat(2000)));
            Ok(Document {
                units: vec![unit],
                ..Document::default()
            })
        }
    }

    fn dispatcher_with(strategy: Arc<dyn ExtractionStrategy>) -> Dispatcher {
        let mut registry = StrategyRegistry::new();
        registry.register(strategy).unwrap();
        Dispatcher::new(registry, Capabilities::compiled_only())
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dispatcher = dispatcher_with(Arc::new(Long));
        let result = dispatcher.extract("/definitely/not/here.long", &ExtractionOptions::default()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("file not found"));
        assert_eq!(result.file_type, ".long");
        assert!(result.content.is_none());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.boom");
        fs::write(&path, b"data").unwrap();

        let dispatcher = dispatcher_with(Arc::new(Panicky));
        let result = dispatcher.extract(&path, &ExtractionOptions::default()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn test_summarize_applied_after_render() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.long");
        fs::write(&path, b"").unwrap();

        let dispatcher = dispatcher_with(Arc::new(Long));
        let options = ExtractionOptions {
            summarize: true,
            max_length: 100,
            ..Default::default()
        };
        let result = dispatcher.extract(&path, &options).await;
        assert!(result.success);
        assert!(result.summarized);
        let content = result.content.unwrap();
        assert!(content.contains("[Content truncated, total length: 2000 characters]"));
        assert!(content.starts_with(&"x".repeat(50)));
    }

    #[tokio::test]
    async fn test_unknown_extension_with_text_content_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.weird");
        fs::write(&path, "plain words\nsecond line").unwrap();

        let dispatcher = dispatcher_with(Arc::new(Long));
        let result = dispatcher.extract(&path, &ExtractionOptions::default()).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.content.as_deref(), Some("plain words\nsecond line"));
    }

    #[tokio::test]
    async fn test_unknown_binary_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 159, 146, 150, 0, 1, 2, 3, 0, 0]).unwrap();

        let dispatcher = dispatcher_with(Arc::new(Long));
        let result = dispatcher.extract(&path, &ExtractionOptions::default()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unsupported file type"));
        assert_eq!(result.file_type, ".bin");
    }
}
