//! Plain text strategy.

use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::TEXT_EXTENSIONS;
use crate::core::io::read_file_async;
use crate::extraction::encoding::{decode_text, looks_like_text};
use crate::plugins::ExtractionStrategy;
use crate::types::{ContentBlock, Document, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Reads text files through the decoding ladder.
///
/// In strict mode, used for unregistered extensions, content that looks
/// binary is rejected instead of being decoded lossily.
pub struct PlainTextStrategy {
    strict: bool,
}

impl PlainTextStrategy {
    pub fn new() -> Self {
        Self { strict: false }
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl Default for PlainTextStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(PlainTextStrategy, "text", "Plain text through an encoding ladder");

#[async_trait]
impl ExtractionStrategy for PlainTextStrategy {
    fn supported_extensions(&self) -> &[&str] {
        TEXT_EXTENSIONS
    }

    async fn extract(&self, path: &Path, _options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let bytes = read_file_async(path).await?;

        if self.strict && !looks_like_text(&bytes) {
            return Err(DocsiftError::backend("text", "content does not look like text"));
        }

        let (text, encoding) = decode_text(&bytes);
        tracing::debug!(encoding = encoding.label(), bytes = bytes.len(), "Decoded text file");

        let mut unit = Unit::new(UnitKind::Body, 1, "");
        if !text.is_empty() {
            unit.push(ContentBlock::text(text));
        }
        Ok(Document {
            units: vec![unit],
            ..Document::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_document;
    use std::fs;
    use tempfile::tempdir;

    async fn extract(strategy: &PlainTextStrategy, name: &str, bytes: &[u8]) -> Result<String> {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        let doc = strategy
            .extract(&path, &ExtractionOptions::default(), &Capabilities::compiled_only())
            .await?;
        Ok(render_document(&doc))
    }

    #[tokio::test]
    async fn test_text_verbatim() {
        let out = extract(&PlainTextStrategy::new(), "a.md", b"# Title\n\nBody\n").await.unwrap();
        assert_eq!(out, "# Title\n\nBody\n");
    }

    #[tokio::test]
    async fn test_windows_1252_file() {
        let out = extract(&PlainTextStrategy::new(), "a.txt", b"caf\xE9 \x93ok\x94").await.unwrap();
        assert_eq!(out, "café \u{201C}ok\u{201D}");
    }

    #[tokio::test]
    async fn test_empty_file_placeholder() {
        let out = extract(&PlainTextStrategy::new(), "empty.txt", b"").await.unwrap();
        assert_eq!(out, "[This document appears to be empty]");
    }

    #[tokio::test]
    async fn test_strict_rejects_binary() {
        let err = extract(&PlainTextStrategy::strict(), "x.bin", &[0x7F, 0x45, 0x4C, 0x46, 0, 0, 1])
            .await
            .unwrap_err();
        assert!(matches!(err, DocsiftError::Backend { .. }));
    }
}
