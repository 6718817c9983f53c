//! calamine backend: the fallback for XLSX and the only reader for XLS,
//! XLSB and ODS. Object counts are not available through calamine, so only
//! the cell grid and dimension are reported.

use crate::extractors::{SECONDARY, run_blocking};
use super::number_format::format_general;
use super::{CellRange, SheetData, WorkbookData, build_document, select_sheets};
use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::{LEGACY_SPREADSHEET_EXTENSIONS, XLSX_EXTENSIONS};
use crate::core::io::display_name;
use crate::extraction::ooxml::{CoreProperties, Package};
use crate::plugins::ExtractionStrategy;
use crate::types::Document;
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use calamine::{Data, Range, Reader, open_workbook_auto};
use once_cell::sync::Lazy;
use std::path::Path;

static EXTENSIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    XLSX_EXTENSIONS
        .iter()
        .chain(LEGACY_SPREADSHEET_EXTENSIONS)
        .copied()
        .collect()
});

pub struct CalamineStrategy;

impl CalamineStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalamineStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(CalamineStrategy, "calamine", "Spreadsheets through calamine");

#[async_trait]
impl ExtractionStrategy for CalamineStrategy {
    fn supported_extensions(&self) -> &[&str] {
        &EXTENSIONS
    }

    fn priority(&self) -> i32 {
        SECONDARY
    }

    fn is_available(&self, caps: &Capabilities) -> bool {
        caps.excel
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("calamine", move || {
            let book = read_with_calamine(&path, options.sheet_name.as_deref())?;
            build_document(&display_name(&path), book, &options)
        })
        .await
    }
}

fn read_with_calamine(path: &Path, requested: Option<&str>) -> Result<WorkbookData> {
    // Only format errors are wrapped; genuine IO errors keep their kind.
    let mut workbook = match open_workbook_auto(path) {
        Ok(wb) => wb,
        Err(calamine::Error::Io(io_err)) if io_err.kind() != std::io::ErrorKind::InvalidData => {
            return Err(io_err.into());
        }
        Err(e) => return Err(DocsiftError::parsing(format!("Failed to open spreadsheet: {}", e))),
    };

    let names = workbook.sheet_names();
    let selected: Vec<String> = select_sheets(&names, requested)?.into_iter().cloned().collect();

    let mut sheets = Vec::with_capacity(selected.len());
    for name in selected {
        let range = workbook.worksheet_range(&name)?;
        sheets.push(sheet_from_range(name, &range));
    }

    let core = ooxml_properties(path);
    Ok(WorkbookData {
        sheet_count: names.len(),
        title: core.title,
        subject: core.subject,
        creator: core.creator,
        created: core.created,
        sheets,
    })
}

/// Core properties of OOXML workbooks; other containers report none.
fn ooxml_properties(path: &Path) -> CoreProperties {
    let is_ooxml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| XLSX_EXTENSIONS.contains(&format!(".{}", e.to_ascii_lowercase()).as_str()));
    if !is_ooxml {
        return CoreProperties::default();
    }
    Package::open(path)
        .and_then(|mut package| package.core_properties())
        .unwrap_or_else(|e| {
            tracing::debug!("Skipping workbook properties: {}", e);
            CoreProperties::default()
        })
}

fn sheet_from_range(name: String, range: &Range<Data>) -> SheetData {
    let mut sheet = SheetData {
        name,
        ..Default::default()
    };
    let (Some((r0, c0)), Some((r1, c1))) = (range.start(), range.end()) else {
        return sheet;
    };
    sheet.dimension = Some(
        CellRange {
            first_row: r0,
            first_col: c0,
            last_row: r1,
            last_col: c1,
        }
        .to_a1(),
    );
    for (row, col, data) in range.cells() {
        if let Some(text) = cell_text(data) {
            sheet.cells.insert((r0 + row as u32, c0 + col as u32), text);
        }
    }
    sheet
}

fn cell_text(data: &Data) -> Option<String> {
    let text = match data {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => format_general(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::MIN && !dt.is_duration() => {
                datetime.format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_general(dt.as_f64()),
        },
        Data::Error(e) => e.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    };
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("  ".to_string())), None);
        assert_eq!(cell_text(&Data::Float(42.0)).as_deref(), Some("42"));
        assert_eq!(cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(cell_text(&Data::Int(7)).as_deref(), Some("7"));
        assert_eq!(cell_text(&Data::Bool(true)).as_deref(), Some("True"));
        assert_eq!(cell_text(&Data::Error(CellErrorType::Div0)).as_deref(), Some("#DIV/0!"));

        let date = Data::DateTime(ExcelDateTime::new(45292.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&date).as_deref(), Some("2024-01-01"));
        let stamp = Data::DateTime(ExcelDateTime::new(45292.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&stamp).as_deref(), Some("2024-01-01 12:00:00"));
    }

    #[test]
    fn test_sheet_from_offset_range() {
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("Name".to_string()));
        range.set_value((1, 2), Data::String("Age".to_string()));
        range.set_value((2, 1), Data::String("Ada".to_string()));
        range.set_value((2, 2), Data::Int(36));

        let sheet = sheet_from_range("People".to_string(), &range);
        assert_eq!(sheet.dimension.as_deref(), Some("B2:C3"));
        assert_eq!(sheet.cells[&(1, 1)], "Name");
        assert_eq!(sheet.cells[&(2, 2)], "36");
        assert_eq!(sheet.charts, 0);
    }

    #[test]
    fn test_unreadable_file_is_error() {
        assert!(read_with_calamine(Path::new("/nonexistent/book.xlsx"), None).is_err());
    }
}
