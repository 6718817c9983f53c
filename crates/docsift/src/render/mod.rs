//! Turning the block model into the textual output format.
//!
//! - [`table`]: bordered monospace grids
//! - [`spatial`]: reading-order reconstruction per unit
//! - [`metadata`]: `Key: Value` preamble sections

pub mod metadata;
pub mod spatial;
pub mod table;

pub use metadata::{SECTION_RULE, render_section};
pub use spatial::{reconstruct, render_block, render_content, render_unit};
pub use table::{MAX_COLUMN_WIDTH, render_table};

use crate::types::Document;

/// Assemble a document: preamble sections, body heading, then units.
///
/// Parts are separated by a blank line.
pub fn render_document(document: &Document) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(document.sections.len() + document.units.len() + 1);
    parts.extend(document.sections.iter().map(render_section));
    if let Some(heading) = &document.body_heading {
        parts.push(heading.clone());
    }
    parts.extend(document.units.iter().map(render_unit));
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, MetadataSection, Unit, UnitKind};

    #[test]
    fn test_render_document_layout() {
        let mut section = MetadataSection::new("--- Document Metadata ---");
        section.push("Number of pages", 1);
        let mut unit = Unit::new(UnitKind::Page, 1, "--- Page 1 ---");
        unit.preamble.push("Page dimensions: 612.00 x 792.00 points".to_string());
        unit.push(ContentBlock::text("Hello").at(10.0, 10.0));

        let doc = crate::types::Document {
            sections: vec![section],
            body_heading: None,
            units: vec![unit],
        };
        assert_eq!(
            render_document(&doc),
            "--- Document Metadata ---\nNumber of pages: 1\n----------------------------------------\n\n\
             --- Page 1 ---\nPage dimensions: 612.00 x 792.00 points\nHello"
        );
    }

    #[test]
    fn test_metadata_only_document_has_no_units() {
        let mut section = MetadataSection::new("--- Document Properties ---");
        section.push("Title", "T");
        let doc = crate::types::Document {
            sections: vec![section],
            body_heading: None,
            units: Vec::new(),
        };
        assert!(!render_document(&doc).contains("---\n\n"));
    }
}
