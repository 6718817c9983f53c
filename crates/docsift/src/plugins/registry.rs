//! Strategy registration and lookup by file extension.

use crate::plugins::ExtractionStrategy;
use crate::{DocsiftError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Validate a plugin name before registration.
///
/// # Rules
///
/// - Name cannot be empty
/// - Name cannot contain whitespace
fn validate_plugin_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DocsiftError::validation("Plugin name cannot be empty"));
    }

    if name.contains(char::is_whitespace) {
        return Err(DocsiftError::validation(format!(
            "Plugin name '{}' cannot contain whitespace",
            name
        )));
    }

    Ok(())
}

/// Extension-keyed registry of extraction strategies.
///
/// Each extension maps to a priority-ordered set; [`StrategyRegistry::chain`]
/// returns it highest priority first, which is the fallback order.
pub struct StrategyRegistry {
    strategies: HashMap<String, BTreeMap<i32, Arc<dyn ExtractionStrategy>>>,
    name_index: HashMap<String, Vec<(String, i32)>>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
            name_index: HashMap::new(),
        }
    }

    /// Registry holding every built-in strategy compiled into this build.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        crate::extractors::register_default_strategies(&mut registry)?;
        Ok(registry)
    }

    /// Register a strategy for every extension it supports.
    ///
    /// # Errors
    ///
    /// - invalid plugin name
    /// - a strategy with the same priority already owns one of the extensions
    /// - `initialize()` failed
    pub fn register(&mut self, strategy: Arc<dyn ExtractionStrategy>) -> Result<()> {
        let name = strategy.name().to_string();
        let priority = strategy.priority();
        let extensions: Vec<String> = strategy
            .supported_extensions()
            .iter()
            .map(|e| e.to_ascii_lowercase())
            .collect();

        validate_plugin_name(&name)?;

        for ext in &extensions {
            if let Some(existing) = self.strategies.get(ext).and_then(|m| m.get(&priority)) {
                return Err(DocsiftError::validation(format!(
                    "Strategy '{}' conflicts with '{}' for {} at priority {}",
                    name,
                    existing.name(),
                    ext,
                    priority
                )));
            }
        }

        strategy.initialize()?;

        let mut index_entries = Vec::with_capacity(extensions.len());
        for ext in extensions {
            self.strategies
                .entry(ext.clone())
                .or_default()
                .insert(priority, Arc::clone(&strategy));
            index_entries.push((ext, priority));
        }

        self.name_index.insert(name, index_entries);
        Ok(())
    }

    /// Strategies for an extension, highest priority first. Empty if unknown.
    pub fn chain(&self, extension: &str) -> Vec<Arc<dyn ExtractionStrategy>> {
        self.strategies
            .get(&extension.to_ascii_lowercase())
            .map(|m| m.values().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.strategies.contains_key(&extension.to_ascii_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.strategies.keys().cloned().collect();
        exts.sort();
        exts
    }

    /// List all registered strategy names.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.name_index.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a strategy from every extension and shut it down.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let index_entries = match self.name_index.remove(name) {
            Some(entries) => entries,
            None => return Ok(()),
        };

        let mut strategy_to_shutdown: Option<Arc<dyn ExtractionStrategy>> = None;

        for (ext, priority) in index_entries {
            if let Some(priority_map) = self.strategies.get_mut(&ext) {
                if let Some(strategy) = priority_map.remove(&priority)
                    && strategy_to_shutdown.is_none()
                {
                    strategy_to_shutdown = Some(strategy);
                }

                if priority_map.is_empty() {
                    self.strategies.remove(&ext);
                }
            }
        }

        if let Some(strategy) = strategy_to_shutdown {
            strategy.shutdown()?;
        }

        Ok(())
    }

    /// Shutdown all strategies and clear the registry.
    pub fn shutdown_all(&mut self) -> Result<()> {
        for name in self.list() {
            self.remove(&name)?;
        }
        Ok(())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
