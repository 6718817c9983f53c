//! `Key: Value` preamble sections.
//!
//! Property reads are fallible and independent: a property whose read fails is
//! dropped with a debug log, never failing the extraction.

use crate::types::MetadataSection;
use std::fmt::Display;

/// Closing rule for every preamble section.
pub const SECTION_RULE: &str = "----------------------------------------";

impl MetadataSection {
    /// Section with a header like `--- Document Properties ---`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Add an entry. Blank values are skipped.
    pub fn push(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        let value = value.to_string();
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.entries.insert(key.into(), trimmed.to_string());
        }
        self
    }

    pub fn push_opt<V: Display>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Add an entry computed by a fallible read; errors omit the entry.
    pub fn collect<V, E, F>(&mut self, key: &str, read: F) -> &mut Self
    where
        V: Display,
        E: Display,
        F: FnOnce() -> std::result::Result<Option<V>, E>,
    {
        match read() {
            Ok(value) => {
                self.push_opt(key, value);
            }
            Err(e) => tracing::debug!("Skipping metadata property '{}': {}", key, e),
        }
        self
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.lines.is_empty()
    }
}

/// Render a section: header, entries, free lines, rule.
pub fn render_section(section: &MetadataSection) -> String {
    let mut out = Vec::with_capacity(section.entries.len() + section.lines.len() + 2);
    out.push(section.title.clone());
    for (key, value) in &section.entries {
        out.push(format!("{}: {}", key, value));
    }
    out.extend(section.lines.iter().cloned());
    out.push(SECTION_RULE.to_string());
    out.join("\n")
}
