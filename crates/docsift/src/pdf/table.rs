//! Stream-mode table detection over word geometry.
//!
//! PDFs without ruling lines still lay tables out as runs of lines whose
//! words fall into the same column bands. A line is split into cells at wide
//! horizontal gaps; consecutive lines with the same cell count and aligned
//! cell starts form a table.

use super::words::Line;
use crate::types::TableGrid;

/// Horizontal gap (points) that separates two cells on one line.
const CELL_GAP: f64 = 10.0;

/// Cell starts within this distance (points) count as the same column.
const COLUMN_TOLERANCE: f64 = 15.0;

/// A row farther below the previous one than this many line heights ends the table.
const MAX_ROW_GAP_RATIO: f64 = 2.5;

pub const MIN_TABLE_ROWS: usize = 3;
pub const MIN_TABLE_COLUMNS: usize = 2;

/// Longer cells are prose, not tabular data.
const MAX_CELL_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub grid: TableGrid,
    pub top: f64,
    pub x0: f64,
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    x0: f64,
}

fn split_cells(line: &Line) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    let mut last_x1 = f64::NEG_INFINITY;
    for word in &line.words {
        match cells.last_mut() {
            Some(cell) if word.x0 - last_x1 <= CELL_GAP => {
                cell.text.push(' ');
                cell.text.push_str(&word.text);
            }
            _ => cells.push(Cell {
                text: word.text.clone(),
                x0: word.x0,
            }),
        }
        last_x1 = word.x1;
    }
    cells
}

fn is_row(cells: &[Cell]) -> bool {
    cells.len() >= MIN_TABLE_COLUMNS && cells.iter().all(|c| c.text.chars().count() <= MAX_CELL_CHARS)
}

fn aligned(a: &[Cell], b: &[Cell]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x.x0 - y.x0).abs() <= COLUMN_TOLERANCE)
}

fn close_enough(prev: &Line, next: &Line) -> bool {
    let height = prev.height().max(next.height()).max(1.0);
    next.top - prev.bottom <= height * MAX_ROW_GAP_RATIO
}

/// Pull tables out of `lines`; returns the tables and the lines left over.
pub fn detect_tables(lines: Vec<Line>) -> (Vec<DetectedTable>, Vec<Line>) {
    let cells: Vec<Vec<Cell>> = lines.iter().map(split_cells).collect();
    let mut in_table = vec![false; lines.len()];
    let mut tables = Vec::new();

    let mut start = 0;
    while start < lines.len() {
        if !is_row(&cells[start]) {
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < lines.len()
            && is_row(&cells[end])
            && aligned(&cells[start], &cells[end])
            && close_enough(&lines[end - 1], &lines[end])
        {
            end += 1;
        }

        if end - start >= MIN_TABLE_ROWS {
            let rows: Vec<Vec<String>> = cells[start..end]
                .iter()
                .map(|row| row.iter().map(|c| c.text.clone()).collect())
                .collect();
            tables.push(DetectedTable {
                grid: TableGrid::new(rows, true),
                top: lines[start].top,
                x0: lines[start..end].iter().map(Line::x0).fold(f64::INFINITY, f64::min),
            });
            in_table[start..end].iter_mut().for_each(|flag| *flag = true);
            start = end;
        } else {
            start += 1;
        }
    }

    let rest = lines
        .into_iter()
        .zip(in_table)
        .filter_map(|(line, taken)| (!taken).then_some(line))
        .collect();
    (tables, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::words::{Word, group_lines};

    fn row(top: f64, cells: &[(&str, f64)]) -> Vec<Word> {
        cells
            .iter()
            .flat_map(|(text, x)| {
                let mut x0 = *x;
                text.split(' ')
                    .map(|w| {
                        let word = Word::new(w, x0, x0 + 5.0 * w.len() as f64, top, top + 10.0);
                        x0 += 5.0 * w.len() as f64 + 3.0;
                        word
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_detects_aligned_columns() {
        let mut words = row(50.0, &[("An introduction paragraph that runs wide", 20.0)]);
        words.extend(row(80.0, &[("Name", 20.0), ("Unit price", 150.0)]));
        words.extend(row(94.0, &[("Widget", 22.0), ("4.50", 152.0)]));
        words.extend(row(108.0, &[("Gadget", 19.0), ("12.00", 148.0)]));
        words.extend(row(150.0, &[("Closing words", 20.0)]));

        let (tables, rest) = detect_tables(group_lines(words));
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.top, 80.0);
        assert_eq!(table.x0, 19.0);
        assert_eq!(table.grid.rows[0], vec!["Name", "Unit price"]);
        assert_eq!(table.grid.rows[2], vec!["Gadget", "12.00"]);
        assert!(table.grid.has_header);

        let texts: Vec<String> = rest.iter().map(Line::text).collect();
        assert_eq!(texts, vec!["An introduction paragraph that runs wide", "Closing words"]);
    }

    #[test]
    fn test_two_rows_are_not_a_table() {
        let mut words = row(80.0, &[("Left", 20.0), ("Right", 200.0)]);
        words.extend(row(94.0, &[("Left", 20.0), ("Right", 200.0)]));
        let (tables, rest) = detect_tables(group_lines(words));
        assert!(tables.is_empty());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_misaligned_rows_break_table() {
        let mut words = row(80.0, &[("a", 20.0), ("b", 100.0)]);
        words.extend(row(94.0, &[("c", 20.0), ("d", 100.0)]));
        words.extend(row(108.0, &[("e", 20.0), ("f", 300.0)]));
        let (tables, _) = detect_tables(group_lines(words));
        assert!(tables.is_empty());
    }
}
