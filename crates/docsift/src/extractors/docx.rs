//! DOCX strategies.
//!
//! `docx-native` walks `word/document.xml` with roxmltree so paragraphs and
//! tables keep their body order and heading styles resolve through
//! `word/styles.xml`. `docx-lite` is the fallback: it has no body order, so
//! tables follow the paragraphs.

use super::{PRIMARY, SECONDARY, run_blocking};
use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::DOCX_EXTENSIONS;
use crate::core::io::read_file_sync;
use crate::extraction::ooxml::{CoreProperties, Package, WORDML_NS};
use crate::plugins::ExtractionStrategy;
use crate::types::{ContentBlock, Document, MetadataSection, TableGrid, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use roxmltree::Node;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const EMBEDDED_MARKER: &str = " [Contains embedded object(s)]";

pub struct DocxNativeStrategy;

impl DocxNativeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxNativeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(DocxNativeStrategy, "docx-native", "Word documents in body order");

#[async_trait]
impl ExtractionStrategy for DocxNativeStrategy {
    fn supported_extensions(&self) -> &[&str] {
        DOCX_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        PRIMARY
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("docx-native", move || {
            let mut package = Package::open(&path)?;
            extract_docx(&mut package, &options)
        })
        .await
    }
}

pub struct DocxLiteStrategy;

impl DocxLiteStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxLiteStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(DocxLiteStrategy, "docx-lite", "Word documents through docx-lite");

#[async_trait]
impl ExtractionStrategy for DocxLiteStrategy {
    fn supported_extensions(&self) -> &[&str] {
        DOCX_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        SECONDARY
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("docx-lite", move || {
            let bytes = read_file_sync(&path)?;
            extract_docx_lite(bytes, &options)
        })
        .await
    }
}

fn properties_section<R: Read + Seek>(package: &mut Package<R>) -> MetadataSection {
    let core = package.core_properties().unwrap_or_else(|e| {
        tracing::debug!("Skipping document properties: {}", e);
        CoreProperties::default()
    });
    let mut section = MetadataSection::new("--- Document Properties ---");
    section
        .push_opt("Title", core.title.as_deref())
        .push_opt("Author", core.creator.as_deref())
        .push_opt("Created", core.created.as_deref())
        .push_opt("Modified", core.modified.as_deref())
        .push_opt("Comments", core.description.as_deref())
        .push_opt("Category", core.category.as_deref())
        .push_opt("Subject", core.subject.as_deref())
        .push_opt("Keywords", core.keywords.as_deref());
    section
}

/// Counts of embedded parts, by relationship kind of the main document part.
#[derive(Debug, Default, PartialEq)]
struct EmbeddedCounts {
    images: usize,
    charts: usize,
    shapes: usize,
}

impl EmbeddedCounts {
    fn from_package<R: Read + Seek>(package: &mut Package<R>) -> Self {
        let mut counts = Self::default();
        let rels = package.relationships(DOCUMENT_PART).unwrap_or_else(|e| {
            tracing::debug!("Ignoring unreadable document relationships: {}", e);
            Vec::new()
        });
        for rel in rels {
            match rel.kind() {
                "image" => counts.images += 1,
                "chart" => counts.charts += 1,
                "shape" => counts.shapes += 1,
                _ => {}
            }
        }
        counts
    }

    fn push_into(&self, section: &mut MetadataSection) {
        if self.images > 0 {
            section.push("Images", self.images);
        }
        if self.charts > 0 {
            section.push("Charts", self.charts);
        }
        if self.shapes > 0 {
            section.push("Shapes", self.shapes);
        }
    }
}

fn extract_docx<R: Read + Seek>(package: &mut Package<R>, options: &ExtractionOptions) -> Result<Document> {
    let xml = package.read_string(DOCUMENT_PART)?;
    let doc = roxmltree::Document::parse(&xml)?;
    let body = doc
        .root_element()
        .children()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| DocsiftError::parsing("word/document.xml has no body"))?;

    let styles = package
        .read_optional(STYLES_PART)
        .map(|styles| style_names(&styles))
        .unwrap_or_default();

    let mut document = Document::new();
    document.sections.push(properties_section(package));

    let paragraphs = body.children().filter(|n| is_w(n, "p")).count();
    let tables = body.children().filter(|n| is_w(n, "tbl")).count();
    let sections = body.descendants().filter(|n| is_w(n, "sectPr")).count().max(1);
    let mut stats = MetadataSection::new("--- Document Statistics ---");
    stats
        .push("Paragraphs", paragraphs)
        .push("Sections", sections)
        .push("Tables", tables);
    EmbeddedCounts::from_package(package).push_into(&mut stats);
    document.sections.push(stats);

    if options.metadata_only {
        return Ok(document);
    }

    document.body_heading = Some("--- Document Content ---".to_string());

    let mut unit = Unit::new(UnitKind::Body, 1, "");
    let mut standalone: Vec<String> = Vec::new();
    let mut order = 0.0;

    for child in body.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "p" if child.tag_name().namespace() == Some(WORDML_NS) => {
                let text = paragraph_text(child);
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    standalone.extend(drawing_descriptors(child));
                    continue;
                }
                let line = match heading_level(child, &styles) {
                    Some(level) => format!("{} {}", "#".repeat(level), trimmed),
                    None if has_embedded_object(child) => format!("{}{}", trimmed, EMBEDDED_MARKER),
                    None => trimmed.to_string(),
                };
                order += 1.0;
                unit.push(ContentBlock::text(line).at(order, 0.0));
            }
            "tbl" if options.office.extract_tables => {
                let grid = table_grid(child);
                if !grid.is_empty() {
                    order += 1.0;
                    unit.push(ContentBlock::table(grid).at(order, 0.0));
                }
            }
            _ => {}
        }
    }
    document.units.push(unit);

    if options.office.extract_images && !standalone.is_empty() {
        let mut drawings = Unit::new(UnitKind::Body, 2, "--- Standalone Drawings ---");
        for (idx, descriptor) in standalone.into_iter().enumerate() {
            drawings.push(ContentBlock::drawing(descriptor).at(idx as f64, 0.0));
        }
        document.units.push(drawings);
    }

    Ok(document)
}

fn is_w(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WORDML_NS)
}

fn w_attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((WORDML_NS, name))
}

/// Style id to display name, from `word/styles.xml`.
fn style_names(xml: &str) -> HashMap<String, String> {
    let Ok(doc) = roxmltree::Document::parse(xml) else {
        tracing::debug!("Ignoring unparsable word/styles.xml");
        return HashMap::new();
    };
    doc.descendants()
        .filter(|n| is_w(n, "style"))
        .filter_map(|style| {
            let id = w_attr(style, "styleId")?;
            let name = style.children().find(|n| is_w(n, "name")).and_then(|n| w_attr(n, "val"))?;
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// `N` for a paragraph styled `Heading N` (built-in names are lower case).
fn heading_level(paragraph: Node, styles: &HashMap<String, String>) -> Option<usize> {
    let style_id = paragraph
        .children()
        .find(|n| is_w(n, "pPr"))
        .and_then(|ppr| ppr.children().find(|n| is_w(n, "pStyle")))
        .and_then(|n| w_attr(n, "val"))?;
    let name = styles.get(style_id).map(String::as_str).unwrap_or(style_id);
    let lower = name.to_ascii_lowercase();
    let level = lower.strip_prefix("heading")?.trim();
    level.parse::<usize>().ok().filter(|l| *l > 0)
}

/// Text of the paragraph's own runs; text boxes nested in drawings are excluded.
fn paragraph_text(paragraph: Node) -> String {
    let mut text = String::new();
    collect_runs(paragraph, &mut text);
    text
}

fn collect_runs(parent: Node, text: &mut String) {
    for child in parent.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "r" => {
                for part in child.children().filter(Node::is_element) {
                    match part.tag_name().name() {
                        "t" => text.push_str(part.text().unwrap_or_default()),
                        "tab" => text.push('\t'),
                        "br" | "cr" => text.push('\n'),
                        "noBreakHyphen" => text.push('-'),
                        _ => {}
                    }
                }
            }
            "hyperlink" | "smartTag" | "ins" | "fldSimple" | "sdt" | "sdtContent" => collect_runs(child, text),
            _ => {}
        }
    }
}

fn has_embedded_object(paragraph: Node) -> bool {
    paragraph
        .descendants()
        .any(|n| is_w(&n, "drawing") || is_w(&n, "pict") || is_w(&n, "object"))
}

/// Descriptors of the drawings in a paragraph that has no text of its own.
fn drawing_descriptors(paragraph: Node) -> Vec<String> {
    paragraph
        .descendants()
        .filter(|n| is_w(n, "drawing") || is_w(n, "pict"))
        .map(|drawing| {
            let name = drawing
                .descendants()
                .find(|n| n.tag_name().name() == "docPr")
                .and_then(|n| n.attribute("descr").filter(|d| !d.is_empty()).or(n.attribute("name")))
                .unwrap_or("Drawing");
            let box_text: Vec<String> = drawing
                .descendants()
                .filter(|n| is_w(n, "txbxContent"))
                .flat_map(|content| content.children().filter(|n| is_w(n, "p")))
                .map(paragraph_text)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if box_text.is_empty() {
                format!("[Drawing: {}]", name)
            } else {
                format!("[Drawing: {}] {}", name, box_text.join(" "))
            }
        })
        .collect()
}

fn table_grid(table: Node) -> TableGrid {
    let rows: Vec<Vec<String>> = table
        .children()
        .filter(|n| is_w(n, "tr"))
        .map(|row| {
            row.children()
                .filter(|n| is_w(n, "tc"))
                .map(|cell| {
                    let mut text = cell
                        .children()
                        .filter(|n| is_w(n, "p"))
                        .map(paragraph_text)
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n");
                    if has_embedded_object(cell) {
                        text.push_str(EMBEDDED_MARKER);
                    }
                    text
                })
                .collect()
        })
        .collect();
    TableGrid::new(rows, true)
}

fn extract_docx_lite(bytes: Vec<u8>, options: &ExtractionOptions) -> Result<Document> {
    let mut package = Package::from_reader(Cursor::new(bytes))?;
    let mut document = Document::new();
    document.sections.push(properties_section(&mut package));

    let counts = EmbeddedCounts::from_package(&mut package);
    let bytes = package.into_inner().into_inner();
    let parsed = docx_lite::parse_document(Cursor::new(&bytes))
        .map_err(|e| DocsiftError::parsing(format!("DOCX parsing failed: {}", e)))?;

    let mut stats = MetadataSection::new("--- Document Statistics ---");
    stats
        .push("Paragraphs", parsed.paragraphs.len())
        .push("Tables", parsed.tables.len());
    counts.push_into(&mut stats);
    document.sections.push(stats);

    if options.metadata_only {
        return Ok(document);
    }

    document.body_heading = Some("--- Document Content ---".to_string());
    let mut unit = Unit::new(UnitKind::Body, 1, "");
    for paragraph in &parsed.paragraphs {
        let text = paragraph.to_text();
        let text = text.trim();
        if !text.is_empty() {
            unit.push(ContentBlock::text(text));
        }
    }
    if options.office.extract_tables {
        for table in &parsed.tables {
            let rows: Vec<Vec<String>> = table
                .rows
                .iter()
                .map(|row| {
                    row.cells
                        .iter()
                        .map(|cell| {
                            cell.paragraphs
                                .iter()
                                .map(|p| p.to_text())
                                .collect::<Vec<_>>()
                                .join(" ")
                                .trim()
                                .to_string()
                        })
                        .collect()
                })
                .collect();
            let grid = TableGrid::new(rows, true);
            if !grid.is_empty() {
                unit.push(ContentBlock::table(grid));
            }
        }
    }
    document.units.push(unit);
    Ok(document)
}
