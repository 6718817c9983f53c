//! Per-page model shared by the layout and structural strategies.

use super::table::detect_tables;
use super::words::{Word, group_lines, paragraphs};
use crate::core::config::PdfOptions;
use crate::types::{ContentBlock, TableGrid, Unit, UnitKind};

#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub format: &'static str,
    /// `(top, x0)` in points, when the backend knows where the image was painted.
    pub position: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    pub grid: TableGrid,
    pub position: Option<(f64, f64)>,
}

/// Everything a backend gathered about one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    /// 1-based page number.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub words: Vec<Word>,
    /// Tables found by an external tool; when empty and detection is enabled,
    /// tables are detected from the words.
    pub tables: Vec<PageTable>,
    pub images: Vec<PageImage>,
    pub links: usize,
    pub annotations: usize,
}

pub fn page_heading(number: usize) -> String {
    format!("--- Page {} ---", number)
}

/// `[Contains 1 table]`, `[Contains 3 tables]`.
pub fn contains_marker(count: usize, singular: &str, plural: &str) -> String {
    format!("[Contains {} {}]", count, if count == 1 { singular } else { plural })
}

impl PageContent {
    pub fn into_unit(mut self, options: &PdfOptions) -> Unit {
        let mut unit =
            Unit::new(UnitKind::Page, self.number, page_heading(self.number)).with_extent(self.width, self.height);
        unit.preamble
            .push(format!("Page dimensions: {:.2} x {:.2} points", self.width, self.height));

        let lines = group_lines(std::mem::take(&mut self.words));
        let lines = if options.extract_tables && self.tables.is_empty() {
            let (found, rest) = detect_tables(lines);
            self.tables = found
                .into_iter()
                .map(|t| PageTable {
                    grid: t.grid,
                    position: Some((t.top, t.x0)),
                })
                .collect();
            rest
        } else {
            lines
        };
        if !options.extract_tables {
            self.tables.clear();
        }
        if !options.extract_images {
            self.images.clear();
        }

        if !self.tables.is_empty() {
            unit.preamble.push(contains_marker(self.tables.len(), "table", "tables"));
        }
        if !self.images.is_empty() {
            unit.preamble.push(contains_marker(self.images.len(), "image", "images"));
            for (idx, image) in self.images.iter().enumerate() {
                unit.preamble
                    .push(format!("  Image {}: {}x{} pixels", idx + 1, image.width, image.height));
            }
        }

        for para in paragraphs(&lines) {
            unit.push(ContentBlock::text(para.text).at(para.top, para.x0));
        }
        for table in self.tables {
            let block = ContentBlock::table(table.grid);
            unit.push(match table.position {
                Some((top, x0)) => block.at(top, x0),
                None => block,
            });
        }
        for (idx, image) in self.images.iter().enumerate() {
            let block = ContentBlock::image(format!(
                "Image {}: {}x{} {}",
                idx + 1,
                image.width,
                image.height,
                image.format
            ));
            unit.push(match image.position {
                Some((top, x0)) => block.at(top, x0),
                None => block,
            });
        }

        if self.links > 0 {
            unit.trailer.push(contains_marker(self.links, "link", "links"));
        }
        if self.annotations > 0 {
            unit.trailer
                .push(contains_marker(self.annotations, "annotation", "annotations"));
        }
        unit
    }
}

/// Marker unit for a page whose processing failed.
pub fn failed_page(number: usize, error: impl Into<String>) -> Unit {
    Unit::failed(UnitKind::Page, number, page_heading(number), error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_unit;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word::new(text, x0, x0 + 5.0 * text.len() as f64, top, top + 10.0)
    }

    #[test]
    fn test_text_then_image_by_position() {
        let page = PageContent {
            number: 1,
            width: 612.0,
            height: 792.0,
            words: vec![word("Intro", 72.0, 10.0)],
            images: vec![PageImage {
                width: 640,
                height: 480,
                format: "jpeg",
                position: Some((50.0, 72.0)),
            }],
            links: 1,
            annotations: 2,
            ..Default::default()
        };
        let rendered = render_unit(&page.into_unit(&PdfOptions::default()));
        assert_eq!(
            rendered,
            "--- Page 1 ---\nPage dimensions: 612.00 x 792.00 points\n[Contains 1 image]\n  Image 1: 640x480 pixels\n\
             Intro\n[Image 1: 640x480 jpeg]\n[Contains 1 link]\n[Contains 2 annotations]"
        );
    }

    #[test]
    fn test_empty_page_placeholder() {
        let page = PageContent {
            number: 2,
            width: 100.0,
            height: 200.0,
            ..Default::default()
        };
        let rendered = render_unit(&page.into_unit(&PdfOptions::default()));
        assert_eq!(
            rendered,
            "--- Page 2 ---\nPage dimensions: 100.00 x 200.00 points\n\
             [This page appears to be empty or contains only non-text elements]"
        );
    }

    #[test]
    fn test_disabled_images_are_dropped() {
        let page = PageContent {
            number: 1,
            width: 100.0,
            height: 100.0,
            images: vec![PageImage {
                width: 1,
                height: 1,
                format: "png",
                position: None,
            }],
            ..Default::default()
        };
        let options = PdfOptions {
            extract_images: false,
            ..Default::default()
        };
        let unit = page.into_unit(&options);
        assert!(unit.blocks.is_empty());
        assert_eq!(unit.preamble.len(), 1);
    }

    #[test]
    fn test_contains_marker() {
        assert_eq!(contains_marker(1, "table", "tables"), "[Contains 1 table]");
        assert_eq!(contains_marker(3, "table", "tables"), "[Contains 3 tables]");
    }
}
