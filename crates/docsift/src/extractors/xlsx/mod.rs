//! Spreadsheet strategies.
//!
//! Both backends reduce a worksheet to a [`SheetData`]: sparse cell strings
//! keyed by zero-based `(row, column)` plus the sheet's object counts. The
//! shared code here applies `sheet_name`/`cell_range`, caps the grid and
//! builds the units.

pub mod number_format;
mod workbook;

#[cfg(feature = "excel")]
mod calamine;

#[cfg(feature = "excel")]
pub use self::calamine::CalamineStrategy;

use super::{PRIMARY, run_blocking};
use crate::core::capabilities::Capabilities;
use crate::core::config::{ExtractionOptions, SpreadsheetOptions};
use crate::core::formats::XLSX_EXTENSIONS;
use crate::core::io::display_name;
use crate::extraction::ooxml::Package;
use crate::plugins::ExtractionStrategy;
use crate::render::SECTION_RULE;
use crate::types::{ContentBlock, Document, MetadataSection, TableGrid, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Parses the workbook package directly, keeping number formats, charts,
/// images, merged ranges and conditional formatting.
pub struct XlsxNativeStrategy;

impl XlsxNativeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxNativeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(XlsxNativeStrategy, "xlsx-native", "Excel workbooks with formats and drawings");

#[async_trait]
impl ExtractionStrategy for XlsxNativeStrategy {
    fn supported_extensions(&self) -> &[&str] {
        XLSX_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        PRIMARY
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("xlsx-native", move || {
            let mut package = Package::open(&path)?;
            let book = workbook::read_workbook(&mut package, options.sheet_name.as_deref())?;
            build_document(&display_name(&path), book, &options)
        })
        .await
    }
}

/// One worksheet, reduced to displayable strings.
#[derive(Debug, Default)]
pub(crate) struct SheetData {
    pub name: String,
    /// Declared `<dimension ref>`; computed from the cells when absent.
    pub dimension: Option<String>,
    pub cells: BTreeMap<(u32, u32), String>,
    pub charts: usize,
    pub images: usize,
    pub merged_ranges: usize,
    pub conditional_rules: usize,
}

/// Workbook-level facts shared by both backends.
#[derive(Debug, Default)]
pub(crate) struct WorkbookData {
    pub sheet_count: usize,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub created: Option<String>,
    /// Sheets to render, already narrowed by `sheet_name`.
    pub sheets: Vec<SheetData>,
}

/// Narrow `names` to the requested sheet, if any.
///
/// # Errors
///
/// `Validation` when the requested sheet does not exist.
pub(crate) fn select_sheets<'a>(names: &'a [String], requested: Option<&str>) -> Result<Vec<&'a String>> {
    match requested {
        None => Ok(names.iter().collect()),
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .map(|n| vec![n])
            .ok_or_else(|| {
                DocsiftError::validation(format!(
                    "Sheet '{}' not found. Available sheets: {}",
                    wanted,
                    names.join(", ")
                ))
            }),
    }
}

fn build_document(file_name: &str, book: WorkbookData, options: &ExtractionOptions) -> Result<Document> {
    let range = options.cell_range.as_deref().map(CellRange::parse).transpose()?;

    let mut properties = MetadataSection::new("--- Workbook Properties ---");
    properties
        .push("Filename", file_name)
        .push("Number of sheets", book.sheet_count)
        .push_opt("Title", book.title.as_deref())
        .push_opt("Subject", book.subject.as_deref())
        .push_opt("Creator", book.creator.as_deref())
        .push_opt("Created", book.created.as_deref());

    let mut document = Document::new();
    document.sections.push(properties);
    if options.metadata_only {
        return Ok(document);
    }

    for (idx, sheet) in book.sheets.into_iter().enumerate() {
        document.units.push(sheet_unit(idx + 1, sheet, range, &options.spreadsheet));
    }
    Ok(document)
}

fn sheet_unit(index: usize, sheet: SheetData, range: Option<CellRange>, limits: &SpreadsheetOptions) -> Unit {
    let mut unit = Unit::new(UnitKind::Sheet, index, format!("--- Sheet: {} ---", sheet.name));

    let used = CellRange::bounding(sheet.cells.keys().copied());
    let dimension = sheet
        .dimension
        .clone()
        .unwrap_or_else(|| used.map(|r| r.to_a1()).unwrap_or_else(|| "A1:A1".to_string()));
    unit.preamble.push(format!("Dimension: {}", dimension));
    for (label, count) in [
        ("Charts", sheet.charts),
        ("Images", sheet.images),
        ("Merged cell ranges", sheet.merged_ranges),
        ("Conditional formatting rules", sheet.conditional_rules),
    ] {
        if count > 0 {
            unit.preamble.push(format!("{}: {}", label, count));
        }
    }
    unit.preamble.push(SECTION_RULE.to_string());

    let Some(bounds) = range.or(used) else {
        return unit;
    };

    let total_rows = bounds.rows();
    let total_cols = bounds.columns();
    let shown_rows = total_rows.min(limits.max_rows as u32);
    let shown_cols = total_cols.min(limits.max_columns as u32);
    if shown_rows < total_rows || shown_cols < total_cols {
        unit.preamble.push(format!(
            "Note: Displaying {}x{} of {}x{} cells",
            shown_rows, shown_cols, total_rows, total_cols
        ));
    }

    let rows: Vec<Vec<String>> = (0..shown_rows)
        .map(|r| {
            (0..shown_cols)
                .map(|c| {
                    sheet
                        .cells
                        .get(&(bounds.first_row + r, bounds.first_col + c))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let has_header = rows
        .first()
        .is_some_and(|first| looks_like_header(first, limits.header_text_ratio));
    let grid = TableGrid::new(rows, has_header);
    if !grid.is_empty() {
        unit.push(ContentBlock::table(grid));
    }

    if total_rows > shown_rows {
        unit.trailer.push(format!("... {} more rows ...", total_rows - shown_rows));
    }
    if total_cols > shown_cols {
        unit.trailer.push(format!("... {} more columns ...", total_cols - shown_cols));
    }
    unit
}

/// A first row reads as a header when at least `ratio` of its non-empty
/// cells are non-numeric.
pub(crate) fn looks_like_header(row: &[String], ratio: f64) -> bool {
    let filled: Vec<&String> = row.iter().filter(|c| !c.trim().is_empty()).collect();
    if filled.is_empty() {
        return false;
    }
    let text = filled
        .iter()
        .filter(|c| c.replace([',', '%'], "").trim().parse::<f64>().is_err())
        .count();
    text as f64 / filled.len() as f64 >= ratio
}

/// Inclusive zero-based cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    /// Parse `A1:C10` (or a single cell like `B2`).
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || DocsiftError::validation(format!("Invalid cell range '{}' (expected e.g. A1:C10)", text));
        let (start, end) = text.split_once(':').unwrap_or((text, text));
        let (r1, c1) = parse_cell_ref(start.trim()).ok_or_else(invalid)?;
        let (r2, c2) = parse_cell_ref(end.trim()).ok_or_else(invalid)?;
        Ok(Self {
            first_row: r1.min(r2),
            first_col: c1.min(c2),
            last_row: r1.max(r2),
            last_col: c1.max(c2),
        })
    }

    pub fn bounding(cells: impl Iterator<Item = (u32, u32)>) -> Option<Self> {
        cells.fold(None, |acc: Option<Self>, (r, c)| {
            Some(match acc {
                None => Self {
                    first_row: r,
                    first_col: c,
                    last_row: r,
                    last_col: c,
                },
                Some(b) => Self {
                    first_row: b.first_row.min(r),
                    first_col: b.first_col.min(c),
                    last_row: b.last_row.max(r),
                    last_col: b.last_col.max(c),
                },
            })
        })
    }

    pub fn rows(&self) -> u32 {
        self.last_row - self.first_row + 1
    }

    pub fn columns(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    pub fn to_a1(self) -> String {
        format!(
            "{}{}:{}{}",
            column_letters(self.first_col),
            self.first_row + 1,
            column_letters(self.last_col),
            self.last_row + 1
        )
    }
}

/// `"C10"` to zero-based `(row, column)`; `$` anchors are ignored.
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| acc.checked_mul(26)?.checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))?;
    let row: u32 = digits.parse().ok()?;
    (row > 0 && col > 0).then(|| (row - 1, col - 1))
}

/// Zero-based column index to letters: 0 -> `A`, 26 -> `AA`.
pub(crate) fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}
