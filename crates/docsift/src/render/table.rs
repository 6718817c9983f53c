//! Monospace grid rendering for tabular data.
//!
//! Every format funnels its tables through [`render_table`], so a table from a
//! PDF page and one from a spreadsheet look the same:
//!
//! ```text
//! | Name | Qty |
//! |------|-----|
//! | Bolt | 12  |
//! ```

use crate::types::TableGrid;

/// Column width ceiling, in characters. Longer content is cut to fit.
pub const MAX_COLUMN_WIDTH: usize = 30;

/// Render a grid with capped column widths and `| … |` framing.
///
/// Cells with embedded newlines expand into several physical rows; the other
/// cells of that logical row are padded so every physical row has the same
/// width.
pub fn render_table(grid: &TableGrid) -> String {
    let widths: Vec<usize> = grid.column_widths.iter().map(|w| (*w).min(MAX_COLUMN_WIDTH)).collect();
    if widths.is_empty() {
        return String::new();
    }

    let row_width = widths.iter().sum::<usize>() + 3 * widths.len() + 1;
    let mut out = String::with_capacity(row_width * (grid.rows.len() + 1) * 2);

    for (row_idx, row) in grid.rows.iter().enumerate() {
        let cell_lines: Vec<Vec<&str>> = (0..widths.len())
            .map(|col| {
                row.get(col)
                    .map(|cell| {
                        let lines: Vec<&str> = cell.lines().collect();
                        if lines.is_empty() { vec![""] } else { lines }
                    })
                    .unwrap_or_else(|| vec![""])
            })
            .collect();
        let height = cell_lines.iter().map(Vec::len).max().unwrap_or(1);

        for line_idx in 0..height {
            out.push('|');
            for (col, width) in widths.iter().enumerate() {
                let text = cell_lines[col].get(line_idx).copied().unwrap_or("");
                out.push(' ');
                push_padded(&mut out, text, *width);
                out.push_str(" |");
            }
            out.push('\n');
        }

        if row_idx == 0 && grid.has_header {
            out.push('|');
            for width in &widths {
                out.extend(std::iter::repeat_n('-', width + 2));
                out.push('|');
            }
            out.push('\n');
        }
    }

    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn push_padded(out: &mut String, text: &str, width: usize) {
    let mut written = 0;
    for ch in text.chars().take(width) {
        // Tabs would break alignment in a monospace grid.
        out.push(if ch == '\t' { ' ' } else { ch });
        written += 1;
    }
    out.extend(std::iter::repeat_n(' ', width - written));
}
