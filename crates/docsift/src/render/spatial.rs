//! Reading-order reconstruction for one unit (page, slide, sheet, chapter).
//!
//! Blocks arrive in discovery order with optional positions. Unknown positions
//! are resolved first, then a stable `(y, x)` sort produces the reading order.

use super::table::render_table;
use crate::types::{BlockContent, ContentBlock, Position, Unit};
use std::cmp::Ordering;

/// Vertical scale applied to a positionless table's discovery index.
///
/// The n-th table (0-based) without coordinates lands at
/// `height * TABLE_Y_FACTOR * (n + 1)`.
pub const TABLE_Y_FACTOR: f64 = 0.3;

/// Inline marker for a unit whose processing failed.
pub const UNIT_ERROR_MARKER: &str = "[Error processing this element]";

/// Assign every block a concrete position.
///
/// Positionless tables get an index-derived estimate so they interleave with
/// the surrounding text. Every other positionless block moves to the bottom of
/// the unit, after all placed content.
pub fn resolve_positions(blocks: &mut [ContentBlock], width: Option<f64>, height: Option<f64>) {
    let bottom = height.unwrap_or_else(|| {
        blocks
            .iter()
            .filter_map(|b| b.position.map(|p| p.y))
            .fold(0.0_f64, f64::max)
            + 1.0
    });

    let mut table_index = 0usize;
    for block in blocks.iter_mut() {
        if block.position.is_some() {
            continue;
        }
        block.position = Some(match (&block.content, height) {
            (BlockContent::Table(_), Some(h)) => {
                table_index += 1;
                Position::new(h * TABLE_Y_FACTOR * table_index as f64, width.unwrap_or(0.0) / 4.0)
            }
            _ => Position::new(bottom, 0.0),
        });
    }
}

/// Order a unit's blocks by ascending `(y, x)`, keeping discovery order on ties.
pub fn reconstruct(unit: &Unit) -> Vec<ContentBlock> {
    let mut blocks = unit.blocks.clone();
    resolve_positions(&mut blocks, unit.width, unit.height);
    blocks.sort_by(|a, b| compare_positions(a.position, b.position));
    blocks
}

fn compare_positions(a: Option<Position>, b: Option<Position>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Render one block as it appears in the output stream.
pub fn render_block(block: &ContentBlock) -> String {
    match &block.content {
        BlockContent::Text(text) => text.clone(),
        BlockContent::Table(grid) => format!("--- Table ---\n{}\n--- End Table ---", render_table(grid)),
        BlockContent::Image(desc)
        | BlockContent::Chart(desc)
        | BlockContent::Shape(desc)
        | BlockContent::Media(desc)
        | BlockContent::Drawing(desc) => bracketed(desc),
    }
}

fn bracketed(desc: &str) -> String {
    if desc.starts_with('[') && desc.ends_with(']') {
        desc.to_string()
    } else {
        format!("[{}]", desc)
    }
}

/// Reconstructed content of a unit, without heading or preamble.
///
/// Never empty: a unit with nothing to show yields its placeholder line and a
/// failed unit yields the error marker.
pub fn render_content(unit: &Unit) -> String {
    if unit.error.is_some() {
        return UNIT_ERROR_MARKER.to_string();
    }

    let rendered: Vec<String> = reconstruct(unit)
        .iter()
        .map(render_block)
        .filter(|s| !s.trim().is_empty())
        .collect();

    if rendered.is_empty() {
        unit.kind.empty_placeholder().to_string()
    } else {
        rendered.join("\n")
    }
}

/// Full unit: heading, preamble, content, trailer.
pub fn render_unit(unit: &Unit) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(unit.preamble.len() + unit.trailer.len() + 2);
    if !unit.heading.is_empty() {
        lines.push(unit.heading.clone());
    }
    lines.extend(unit.preamble.iter().cloned());
    lines.push(render_content(unit));
    lines.extend(unit.trailer.iter().cloned());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TableGrid, UnitKind};

    fn page(blocks: Vec<ContentBlock>) -> Unit {
        let mut unit = Unit::new(UnitKind::Page, 1, "--- Page 1 ---").with_extent(600.0, 800.0);
        unit.blocks = blocks;
        unit
    }

    fn texts(blocks: &[ContentBlock]) -> Vec<String> {
        blocks.iter().map(render_block).collect()
    }

    #[test]
    fn test_sorts_by_y_then_x() {
        let unit = page(vec![
            ContentBlock::text("bottom").at(500.0, 10.0),
            ContentBlock::text("top-right").at(10.0, 300.0),
            ContentBlock::text("top-left").at(10.0, 20.0),
        ]);
        assert_eq!(texts(&reconstruct(&unit)), vec!["top-left", "top-right", "bottom"]);
    }

    #[test]
    fn test_identical_positions_keep_discovery_order() {
        let unit = page(vec![
            ContentBlock::text("first").at(40.0, 40.0),
            ContentBlock::text("second").at(40.0, 40.0),
            ContentBlock::text("third").at(40.0, 40.0),
        ]);
        assert_eq!(texts(&reconstruct(&unit)), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unknown_image_position_trails_placed_content() {
        let unit = page(vec![
            ContentBlock::image("Image 1: 20x20 png"),
            ContentBlock::text("body").at(700.0, 0.0),
        ]);
        let ordered = reconstruct(&unit);
        assert_eq!(texts(&ordered), vec!["body", "[Image 1: 20x20 png]"]);
        assert_eq!(ordered[1].position, Some(Position::new(800.0, 0.0)));
    }

    #[test]
    fn test_positionless_tables_interleave_by_index() {
        let grid = TableGrid::new(vec![vec!["a".to_string()]], false);
        let unit = page(vec![
            ContentBlock::text("intro").at(100.0, 0.0),
            ContentBlock::text("middle").at(400.0, 0.0),
            ContentBlock::table(grid.clone()),
            ContentBlock::table(grid),
        ]);
        let ordered = reconstruct(&unit);
        // 800 * 0.3 = 240 and 800 * 0.6 = 480
        assert_eq!(ordered[1].position, Some(Position::new(240.0, 150.0)));
        assert!(matches!(ordered[1].content, BlockContent::Table(_)));
        assert_eq!(texts(&ordered[2..3].to_vec()), vec!["middle"]);
        assert_eq!(ordered[3].position.map(|p| p.y.round()), Some(480.0));
    }

    #[test]
    fn test_empty_unit_placeholder() {
        let unit = page(Vec::new());
        assert_eq!(
            render_content(&unit),
            "[This page appears to be empty or contains only non-text elements]"
        );
    }

    #[test]
    fn test_whitespace_only_text_counts_as_empty() {
        let unit = page(vec![ContentBlock::text("   \n  ").at(1.0, 1.0)]);
        assert_eq!(render_content(&unit), UnitKind::Page.empty_placeholder());
    }

    #[test]
    fn test_failed_unit_renders_error_marker() {
        let unit = Unit::failed(UnitKind::Slide, 2, "--- Slide 2 ---", "bad xml");
        assert_eq!(render_unit(&unit), "--- Slide 2 ---\n[Error processing this element]");
    }

    #[test]
    fn test_table_block_is_wrapped() {
        let grid = TableGrid::new(vec![vec!["h".to_string()], vec!["v".to_string()]], true);
        let rendered = render_block(&ContentBlock::table(grid));
        assert_eq!(rendered, "--- Table ---\n| h |\n|---|\n| v |\n--- End Table ---");
    }

    #[test]
    fn test_two_page_example() {
        let mut first = page(vec![
            ContentBlock::image("Image 1: 100x80 png").at(50.0, 0.0),
            ContentBlock::text("Hello").at(10.0, 0.0),
        ]);
        first.index = 1;
        let second = Unit::new(UnitKind::Page, 2, "--- Page 2 ---").with_extent(600.0, 800.0);

        let output = format!("{}\n\n{}", render_unit(&first), render_unit(&second));
        let text_at = output.find("Hello").unwrap();
        let image_at = output.find("[Image 1: 100x80 png]").unwrap();
        let placeholder_at = output.find(UnitKind::Page.empty_placeholder()).unwrap();
        assert!(text_at < image_at && image_at < placeholder_at);
    }
}
