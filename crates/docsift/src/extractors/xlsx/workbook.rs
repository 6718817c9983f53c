//! Native SpreadsheetML reader.
//!
//! Reads only what the sheet layout needs: cell values with their number
//! formats, the declared dimension, and counts of merged ranges,
//! conditional-formatting rules, charts and pictures.

use super::number_format::{NumberFormat, builtin_format_code, format_general};
use super::{SheetData, WorkbookData, parse_cell_ref, select_sheets};
use crate::extraction::ooxml::{CoreProperties, Package, RELS_NS, parse_relationships, resolve_target};
use crate::{DocsiftError, Result};
use roxmltree::Node;
use std::collections::HashMap;
use std::io::{Read, Seek};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

pub(crate) fn read_workbook<R: Read + Seek>(package: &mut Package<R>, requested: Option<&str>) -> Result<WorkbookData> {
    let workbook_part = workbook_part(package);
    let xml = package.read_string(&workbook_part)?;
    let doc = roxmltree::Document::parse(&xml)?;

    let date1904 = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "workbookPr")
        .and_then(|n| n.attribute("date1904"))
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let rels: HashMap<String, String> = package
        .relationships(&workbook_part)?
        .into_iter()
        .map(|rel| (rel.id, resolve_target(&workbook_part, &rel.target)))
        .collect();

    let declared: Vec<(String, Option<String>)> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
        .filter_map(|n| {
            let name = n.attribute("name")?.to_string();
            let part = n.attribute((RELS_NS, "id")).and_then(|id| rels.get(id)).cloned();
            Some((name, part))
        })
        .collect();
    if declared.is_empty() {
        return Err(DocsiftError::parsing("Workbook declares no sheets"));
    }

    let names: Vec<String> = declared.iter().map(|(name, _)| name.clone()).collect();
    let selected = select_sheets(&names, requested)?;

    let shared = package
        .read_optional("xl/sharedStrings.xml")
        .map(|xml| shared_strings(&xml))
        .transpose()?
        .unwrap_or_default();
    let styles = package
        .read_optional("xl/styles.xml")
        .map(|xml| CellStyles::parse(&xml))
        .transpose()?
        .unwrap_or_default();

    let core = package.core_properties().unwrap_or_else(|e| {
        tracing::debug!("Skipping workbook properties: {}", e);
        CoreProperties::default()
    });

    let context = CellContext {
        shared: &shared,
        styles: &styles,
        date1904,
    };

    let mut sheets = Vec::with_capacity(selected.len());
    for name in selected {
        let part = declared
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, part)| part.clone())
            .ok_or_else(|| DocsiftError::parsing(format!("Sheet '{}' has no worksheet part", name)))?;
        sheets.push(read_sheet(package, name, &part, &context)?);
    }

    Ok(WorkbookData {
        sheet_count: names.len(),
        title: core.title,
        subject: core.subject,
        creator: core.creator,
        created: core.created,
        sheets,
    })
}

/// Main part named by the package's `officeDocument` relationship.
fn workbook_part<R: Read + Seek>(package: &mut Package<R>) -> String {
    package
        .read_optional("_rels/.rels")
        .and_then(|xml| parse_relationships(&xml).ok())
        .and_then(|rels| {
            rels.into_iter()
                .find(|rel| rel.kind() == "officeDocument")
                .map(|rel| resolve_target("", &rel.target))
        })
        .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string())
}

/// Shared string table; phonetic runs (`rPh`) are skipped.
fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "si")
        .map(rich_text)
        .collect())
}

fn rich_text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "t")
        .filter(|t| !t.ancestors().any(|a| a.tag_name().name() == "rPh"))
        .filter_map(|t| t.text())
        .collect()
}

/// Number formats addressed by cell style index (`s` attribute).
#[derive(Debug, Default)]
struct CellStyles {
    formats: Vec<NumberFormat>,
}

impl CellStyles {
    fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let custom: HashMap<u32, &str> = doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "numFmt")
            .filter_map(|n| Some((n.attribute("numFmtId")?.parse().ok()?, n.attribute("formatCode")?)))
            .collect();

        let formats = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "cellXfs")
            .map(|xfs| {
                xfs.children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "xf")
                    .map(|xf| {
                        let id: u32 = xf.attribute("numFmtId").and_then(|v| v.parse().ok()).unwrap_or(0);
                        custom
                            .get(&id)
                            .copied()
                            .or_else(|| builtin_format_code(id))
                            .map(NumberFormat::from_code)
                            .unwrap_or(NumberFormat::General)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { formats })
    }

    fn format(&self, style: Option<usize>) -> NumberFormat {
        style
            .and_then(|s| self.formats.get(s).copied())
            .unwrap_or(NumberFormat::General)
    }
}

struct CellContext<'a> {
    shared: &'a [String],
    styles: &'a CellStyles,
    date1904: bool,
}

impl CellContext<'_> {
    fn value(&self, cell: Node) -> Option<String> {
        let raw = cell
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "v")
            .and_then(|v| v.text());

        let value = match cell.attribute("t").unwrap_or("n") {
            "s" => self.shared.get(raw?.trim().parse::<usize>().ok()?)?.clone(),
            "inlineStr" => cell
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "is")
                .map(rich_text)?,
            "b" => match raw?.trim() {
                "1" => "True".to_string(),
                _ => "False".to_string(),
            },
            "str" | "e" | "d" => raw?.to_string(),
            _ => {
                let raw = raw?.trim();
                match raw.parse::<f64>() {
                    Ok(number) => {
                        let style = cell.attribute("s").and_then(|s| s.parse().ok());
                        match self.styles.format(style) {
                            NumberFormat::General => format_general(number),
                            format => format.format(number, self.date1904),
                        }
                    }
                    Err(_) => raw.to_string(),
                }
            }
        };
        (!value.trim().is_empty()).then_some(value)
    }
}

fn read_sheet<R: Read + Seek>(
    package: &mut Package<R>,
    name: &str,
    part: &str,
    context: &CellContext,
) -> Result<SheetData> {
    let xml = package.read_string(part)?;
    let doc = roxmltree::Document::parse(&xml)?;

    let mut sheet = SheetData {
        name: name.to_string(),
        ..Default::default()
    };

    sheet.dimension = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "dimension")
        .and_then(|n| n.attribute("ref"))
        .map(str::to_string);

    let mut next_row = 0u32;
    for row in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "row")
    {
        let row_idx = row
            .attribute("r")
            .and_then(|r| r.parse::<u32>().ok())
            .map(|r| r.saturating_sub(1))
            .unwrap_or(next_row);
        next_row = row_idx + 1;

        let mut next_col = 0u32;
        for cell in row.children().filter(|n| n.is_element() && n.tag_name().name() == "c") {
            let col_idx = cell
                .attribute("r")
                .and_then(parse_cell_ref)
                .map(|(_, c)| c)
                .unwrap_or(next_col);
            next_col = col_idx + 1;
            if let Some(value) = context.value(cell) {
                sheet.cells.insert((row_idx, col_idx), value);
            }
        }
    }

    sheet.merged_ranges = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "mergeCell")
        .count();
    sheet.conditional_rules = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "cfRule")
        .count();

    let drawings: Vec<String> = package
        .relationships(part)
        .unwrap_or_else(|e| {
            tracing::debug!(sheet = name, "Ignoring unreadable sheet relationships: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter(|rel| rel.kind() == "drawing" && !rel.external)
        .map(|rel| resolve_target(part, &rel.target))
        .collect();
    for drawing in drawings {
        let Some(xml) = package.read_optional(&drawing) else {
            continue;
        };
        match roxmltree::Document::parse(&xml) {
            Ok(doc) => {
                for node in doc.descendants().filter(Node::is_element) {
                    match node.tag_name().name() {
                        "pic" => sheet.images += 1,
                        "chart" if node.tag_name().namespace().is_some_and(|ns| ns.ends_with("/chart")) => {
                            sheet.charts += 1
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => tracing::debug!(sheet = name, "Ignoring unparsable drawing {}: {}", drawing, e),
        }
    }

    Ok(sheet)
}
