//! Fallback chain runner.
//!
//! One generic loop for every format: strategies run in the order given, the
//! first `Ok` wins unchanged, and an `Err` only moves the loop along.

use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::plugins::ExtractionStrategy;
use crate::types::Document;
use crate::{DocsiftError, Result};
use std::path::Path;
use std::sync::Arc;

/// Run `strategies` in order until one succeeds.
///
/// # Errors
///
/// `ChainExhausted` carrying the last strategy's error message when every
/// available strategy failed, or `no extraction strategy available` when none
/// could run at all.
#[tracing::instrument(skip(strategies, options, capabilities), fields(strategies = strategies.len()))]
pub async fn run_chain(
    strategies: &[Arc<dyn ExtractionStrategy>],
    path: &Path,
    options: &ExtractionOptions,
    capabilities: &Capabilities,
) -> Result<Document> {
    let mut last_error: Option<String> = None;

    for strategy in strategies {
        if !strategy.is_available(capabilities) {
            tracing::debug!(strategy = strategy.name(), "Strategy unavailable, skipping");
            continue;
        }

        match strategy.extract(path, options, capabilities).await {
            Ok(document) => {
                tracing::debug!(strategy = strategy.name(), units = document.unit_count(), "Strategy succeeded");
                return Ok(document);
            }
            Err(err) => {
                tracing::warn!(strategy = strategy.name(), error = %err, "Extraction strategy failed, trying next");
                last_error = Some(match err {
                    DocsiftError::Backend { .. } => err.to_string(),
                    other => format!("{} failed: {}", strategy.name(), other),
                });
            }
        }
    }

    Err(DocsiftError::ChainExhausted {
        last: last_error.unwrap_or_else(|| "no extraction strategy available".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::Plugin;
    use crate::types::{ContentBlock, Unit, UnitKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Fail(&'static str),
        Succeed(&'static str),
        Unavailable,
    }

    struct Scripted {
        name: &'static str,
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Plugin for Scripted {
        fn name(&self) -> &str {
            self.name
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
    impl ExtractionStrategy for Scripted {
        fn supported_extensions(&self) -> &[&str] {
            &[".test"]
        }

        fn is_available(&self, _: &Capabilities) -> bool {
            !matches!(self.outcome, Outcome::Unavailable)
        }

        async fn extract(&self, _: &Path, _: &ExtractionOptions, _: &Capabilities) -> Result<Document> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Fail(msg) => Err(DocsiftError::backend(self.name, msg)),
                Outcome::Succeed(text) => {
                    let mut unit = Unit::new(UnitKind::Body, 1, "");
                    unit.push(ContentBlock::text(text));
                    Ok(Document {
                        units: vec![unit],
                        ..Document::default()
                    })
                }
                Outcome::Unavailable => unreachable!("unavailable strategies are never invoked"),
            }
        }
    }

    fn as_dyn(items: &[&Arc<Scripted>]) -> Vec<Arc<dyn ExtractionStrategy>> {
        items.iter().map(|s| Arc::clone(s) as Arc<dyn ExtractionStrategy>).collect()
    }

    fn only_text(doc: &Document) -> String {
        match &doc.units[0].blocks[0].content {
            crate::types::BlockContent::Text(t) => t.clone(),
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_strategy_output_is_returned_verbatim() {
        let a = Scripted::new("a", Outcome::Fail("boom"));
        let b = Scripted::new("b", Outcome::Succeed("from b"));
        let c = Scripted::new("c", Outcome::Succeed("from c"));

        let doc = run_chain(
            &as_dyn(&[&a, &b, &c]),
            Path::new("x.test"),
            &ExtractionOptions::default(),
            &Capabilities::default(),
        )
        .await
        .unwrap();

        assert_eq!(only_text(&doc), "from b");
        assert_eq!(doc.unit_count(), 1);
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sparse_success_is_final() {
        let a = Scripted::new("a", Outcome::Succeed(""));
        let b = Scripted::new("b", Outcome::Succeed("richer"));

        let doc = run_chain(
            &as_dyn(&[&a, &b]),
            Path::new("x.test"),
            &ExtractionOptions::default(),
            &Capabilities::default(),
        )
        .await
        .unwrap();

        assert_eq!(only_text(&doc), "");
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_chain_keeps_last_error() {
        let a = Scripted::new("a", Outcome::Fail("first"));
        let b = Scripted::new("b", Outcome::Fail("second"));

        let err = run_chain(
            &as_dyn(&[&a, &b]),
            Path::new("x.test"),
            &ExtractionOptions::default(),
            &Capabilities::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "all extraction strategies exhausted: b failed: second");
    }

    #[tokio::test]
    async fn test_unavailable_strategies_are_skipped() {
        let a = Scripted::new("a", Outcome::Unavailable);
        let b = Scripted::new("b", Outcome::Succeed("b ran"));

        let doc = run_chain(
            &as_dyn(&[&a, &b]),
            Path::new("x.test"),
            &ExtractionOptions::default(),
            &Capabilities::default(),
        )
        .await
        .unwrap();
        assert_eq!(only_text(&doc), "b ran");
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let err = run_chain(&[], Path::new("x"), &ExtractionOptions::default(), &Capabilities::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no extraction strategy available"));
    }
}
