//! Delimited text strategy: dialect sniffing, column analysis, tab-joined rows.

use super::run_blocking;
use crate::core::capabilities::Capabilities;
use crate::core::config::{CsvOptions, ExtractionOptions};
use crate::core::formats::CSV_EXTENSIONS;
use crate::core::io::{display_name, read_file_sync};
use crate::extraction::encoding::{CSV_LADDER, decode_lossy};
use crate::plugins::ExtractionStrategy;
use crate::render::SECTION_RULE;
use crate::types::{ContentBlock, Document, MetadataSection, Unit, UnitKind};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Bytes examined for dialect detection.
pub const SAMPLE_SIZE: usize = 8192;

/// Candidate delimiters, in tie-break order.
pub const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

pub const TRUNCATION_MARKER: &str = "... (truncated due to large size)";

/// Data rows needed before the per-column analysis is shown.
const ANALYSIS_MIN_ROWS: usize = 10;
const NUMERIC_RATIO: f64 = 0.9;
const SPARSE_RATIO: f64 = 0.5;
/// Data rows consulted by the header heuristic.
const HEADER_PROBE_ROWS: usize = 20;

pub struct CsvStrategy;

impl CsvStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(CsvStrategy, "csv", "Delimited text with dialect sniffing");

#[async_trait]
impl ExtractionStrategy for CsvStrategy {
    fn supported_extensions(&self) -> &[&str] {
        CSV_EXTENSIONS
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let csv_options = options.csv.clone();
        let metadata_only = options.metadata_only;
        run_blocking("csv", move || {
            let bytes = read_file_sync(&path)?;
            let (text, encoding) = decode_lossy(&bytes, CSV_LADDER);
            tracing::debug!(encoding = encoding.label(), "Decoded delimited text");
            build_document(&display_name(&path), &text, &csv_options, metadata_only)
        })
        .await
    }
}

/// Detected delimiter and header presence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dialect {
    pub delimiter: char,
    pub quote: char,
    pub has_header: bool,
    /// `false` when sniffing failed and the delimiter is a guess.
    pub sniffed: bool,
}

fn sample_of(text: &str) -> &str {
    if text.len() <= SAMPLE_SIZE {
        return text;
    }
    let mut end = SAMPLE_SIZE;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Sniff the dialect from a sample.
///
/// The delimiter is the candidate that occurs the same non-zero number of
/// times (outside quotes) on the most sample lines. When no candidate is
/// consistent, the first candidate present is used and a header is assumed.
pub fn sniff(sample: &str) -> Dialect {
    let lines: Vec<&str> = complete_lines(sample);

    let mut best: Option<(char, usize, usize)> = None;
    for &candidate in &DELIMITERS {
        let counts: Vec<usize> = lines.iter().map(|l| count_unquoted(l, candidate)).collect();
        let Some(&mode) = mode_of(&counts) else { continue };
        if mode == 0 {
            continue;
        }
        let agreeing = counts.iter().filter(|&&c| c == mode).count();
        let better = match best {
            None => true,
            Some((_, best_agree, best_mode)) => (agreeing, mode) > (best_agree, best_mode),
        };
        if better {
            best = Some((candidate, agreeing, mode));
        }
    }

    match best {
        Some((delimiter, agreeing, _)) if lines.len() < 2 || agreeing * 2 > lines.len() => Dialect {
            delimiter,
            quote: '"',
            has_header: detect_header(sample, delimiter),
            sniffed: true,
        },
        _ => Dialect {
            delimiter: DELIMITERS.iter().copied().find(|d| sample.contains(*d)).unwrap_or(','),
            quote: '"',
            has_header: true,
            sniffed: false,
        },
    }
}

/// Non-blank lines of the sample; an unterminated last line may be cut short
/// and is dropped.
fn complete_lines(sample: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if !sample.ends_with('\n') && lines.len() > 2 {
        lines.pop();
    }
    lines
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn mode_of(values: &[usize]) -> Option<&usize> {
    values
        .iter()
        .max_by_key(|v| (values.iter().filter(|w| w == v).count(), **v))
}

/// Header heuristic: the first row is a header when, column by column, it
/// differs in type or length from the rows below it more often than not.
fn detect_header(sample: &str, delimiter: char) -> bool {
    let rows = parse_rows(sample, delimiter, HEADER_PROBE_ROWS + 1);
    let Some((header, data)) = rows.split_first() else {
        return false;
    };
    if data.is_empty() {
        return false;
    }

    let mut votes: i32 = 0;
    for (col, name) in header.iter().enumerate() {
        let values: Vec<&str> = data.iter().filter_map(|r| r.get(col)).map(String::as_str).collect();
        if values.is_empty() {
            continue;
        }
        if values.iter().all(|v| is_numeric(v)) {
            votes += if is_numeric(name) { -1 } else { 1 };
            continue;
        }
        let first_len = values[0].chars().count();
        if values.iter().all(|v| v.chars().count() == first_len) {
            votes += if name.chars().count() == first_len { -1 } else { 1 };
        }
    }
    votes > 0
}

fn parse_rows(text: &str, delimiter: char, limit: usize) -> Vec<Vec<String>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .take(limit)
        .filter_map(|r| r.ok())
        .map(|r| r.iter().map(str::to_string).collect())
        .collect()
}

/// Digits after removing at most one `.` and one `-`.
pub fn is_numeric(value: &str) -> bool {
    let v = value.trim().replacen('.', "", 1).replacen('-', "", 1);
    !v.is_empty() && v.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Default, Clone, Copy)]
struct ColumnStats {
    numeric: usize,
    empty: usize,
    total: usize,
}

impl ColumnStats {
    fn describe(&self) -> String {
        let numeric = self.numeric as f64 / self.total as f64;
        let empty = self.empty as f64 / self.total as f64;
        let mut kind = if numeric > NUMERIC_RATIO { "Numeric" } else { "Text" }.to_string();
        if empty > SPARSE_RATIO {
            kind.push_str(" (Sparse)");
        }
        kind
    }
}

fn build_document(name: &str, text: &str, options: &CsvOptions, metadata_only: bool) -> Result<Document> {
    let sample = sample_of(text);
    let dialect = sniff(sample);

    let estimated = if text.len() > sample.len() {
        "1000+".to_string()
    } else {
        sample.matches('\n').count().to_string()
    };

    let mut section = MetadataSection::new(format!("--- CSV File Analysis: {} ---", name));
    section.push("Estimated number of rows", estimated);
    if dialect.sniffed {
        section.push("Detected delimiter", format!("'{}'", dialect.delimiter));
        section.push("Quote character", format!("'{}'", dialect.quote));
        section.push("Has header row", if dialect.has_header { "True" } else { "False" });
    } else {
        section.push("Using delimiter", format!("'{}'", dialect.delimiter));
    }

    if metadata_only {
        return Ok(Document {
            sections: vec![section],
            ..Document::default()
        });
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(dialect.delimiter as u8)
        .quote(dialect.quote as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header: Option<Vec<String>> = if dialect.has_header {
        records
            .next()
            .transpose()?
            .map(|r| r.iter().map(str::to_string).collect())
    } else {
        None
    };

    let mut lines: Vec<String> = Vec::new();
    if let Some(header) = &header {
        lines.push(format!("Column count: {}", header.len()));
        lines.push(format!("Headers: {}", header.join(", ")));
        lines.push(SECTION_RULE.to_string());
    }

    let mut rows: Vec<String> = Vec::new();
    if let Some(header) = &header {
        rows.push(header.join("\t"));
    }

    let mut stats: Vec<ColumnStats> = Vec::new();
    let mut data_rows = 0usize;
    for record in records.by_ref() {
        let record = record?;
        if data_rows == options.max_rows {
            rows.push(TRUNCATION_MARKER.to_string());
            break;
        }
        for (idx, value) in record.iter().enumerate() {
            if stats.len() <= idx {
                stats.resize(idx + 1, ColumnStats::default());
            }
            let col = &mut stats[idx];
            col.total += 1;
            if value.trim().is_empty() {
                col.empty += 1;
            } else if is_numeric(value) {
                col.numeric += 1;
            }
        }
        rows.push(record.iter().collect::<Vec<_>>().join("\t"));
        data_rows += 1;
    }

    if options.analyze_columns
        && data_rows > ANALYSIS_MIN_ROWS
        && let Some(header) = &header
    {
        lines.push("\nColumn Analysis:".to_string());
        for (idx, name) in header.iter().enumerate() {
            if let Some(col) = stats.get(idx).filter(|c| c.total > 0) {
                lines.push(format!("  {}: {}", name, col.describe()));
            }
        }
        lines.push(SECTION_RULE.to_string());
    }

    let mut unit = Unit::new(UnitKind::Body, 1, "");
    unit.preamble = lines;
    if !rows.is_empty() {
        unit.push(ContentBlock::text(rows.join("\n")));
    }

    Ok(Document {
        sections: vec![section],
        body_heading: None,
        units: vec![unit],
    })
}
