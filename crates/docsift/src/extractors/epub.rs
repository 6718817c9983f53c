//! EPUB strategy.
//!
//! Reads the package document (OPF) for metadata, manifest and spine, the NCX
//! or EPUB 3 navigation document for the table of contents, and each XHTML
//! document for text. Spine documents come first, in reading order, followed
//! by XHTML documents the spine does not reference.

use super::run_blocking;
use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::EPUB_EXTENSIONS;
use crate::extraction::html::html_to_text;
use crate::extraction::ooxml::{Package, parse_xml_text, resolve_target};
use crate::plugins::ExtractionStrategy;
use crate::render::SECTION_RULE;
use crate::types::{ContentBlock, Document, MetadataSection, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use roxmltree::Node;
use std::collections::HashSet;
use std::path::Path;

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

pub struct EpubStrategy;

impl EpubStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EpubStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(EpubStrategy, "epub", "EPUB 2/3 books");

#[async_trait]
impl ExtractionStrategy for EpubStrategy {
    fn supported_extensions(&self) -> &[&str] {
        EPUB_EXTENSIONS
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("epub", move || {
            let mut package = Package::open(&path)?;
            extract_epub(&mut package, &options)
        })
        .await
    }
}

#[derive(Debug, Clone)]
struct ManifestItem {
    id: String,
    href: String,
    /// Package-rooted path of the item.
    full_path: String,
    media_type: String,
    properties: String,
}

#[derive(Debug, Default)]
struct PackageDocument {
    title: Option<String>,
    authors: Vec<String>,
    language: Option<String>,
    isbn: Option<String>,
    publisher: Option<String>,
    date: Option<String>,
    manifest: Vec<ManifestItem>,
    spine: Vec<String>,
    toc_id: Option<String>,
}

impl PackageDocument {
    fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|i| i.id == id)
    }
}

fn extract_epub<R: std::io::Read + std::io::Seek>(
    package: &mut Package<R>,
    options: &ExtractionOptions,
) -> Result<Document> {
    let container = package.read_string("META-INF/container.xml")?;
    let opf_path = rootfile_path(&container)?;
    let opf = parse_package_document(&package.read_string(&opf_path)?, &opf_path)?;

    let mut document = Document::new();
    document.sections.push(metadata_section(&opf));

    if options.epub.extract_toc {
        let toc = table_of_contents(package, &opf);
        if !toc.is_empty() {
            let mut section = MetadataSection::new("--- Table of Contents ---");
            for line in toc {
                section.line(line);
            }
            document.sections.push(section);
        }
    }

    document.sections.push(statistics_section(&opf));

    if options.metadata_only {
        return Ok(document);
    }

    document.body_heading = Some("--- Content ---".to_string());

    let mut seen: HashSet<&str> = HashSet::new();
    let mut index = 0;
    for idref in &opf.spine {
        let Some(item) = opf.item(idref).filter(|i| i.media_type == XHTML_MEDIA_TYPE) else {
            continue;
        };
        seen.insert(item.id.as_str());
        index += 1;
        if let Some(unit) = chapter_unit(package, item, index, "Document") {
            document.units.push(unit);
        }
    }

    for item in opf.manifest.iter().filter(|i| {
        i.media_type == XHTML_MEDIA_TYPE && !seen.contains(i.id.as_str()) && !i.href.starts_with("nav")
    }) {
        index += 1;
        if let Some(unit) = chapter_unit(package, item, index, "Additional Document") {
            document.units.push(unit);
        }
    }

    Ok(document)
}

fn rootfile_path(container_xml: &str) -> Result<String> {
    let doc = roxmltree::Document::parse(container_xml)?;
    doc.descendants()
        .find(|n| n.tag_name().name() == "rootfile")
        .and_then(|n| n.attribute("full-path"))
        .map(str::to_string)
        .ok_or_else(|| DocsiftError::parsing("No rootfile found in container.xml"))
}

fn parse_package_document(xml: &str, opf_path: &str) -> Result<PackageDocument> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    let mut opf = PackageDocument::default();

    if let Some(metadata) = root.children().find(|n| n.tag_name().name() == "metadata") {
        opf.title = parse_xml_text(metadata, "title");
        opf.language = parse_xml_text(metadata, "language");
        opf.publisher = parse_xml_text(metadata, "publisher");
        opf.date = parse_xml_text(metadata, "date");
        opf.authors = metadata
            .children()
            .filter(|n| n.tag_name().name() == "creator")
            .filter_map(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        opf.isbn = metadata
            .children()
            .filter(|n| n.tag_name().name() == "identifier")
            .find(is_isbn_identifier)
            .and_then(|n| n.text())
            .map(|t| t.trim().trim_start_matches("urn:isbn:").to_string());
    }

    if let Some(manifest) = root.children().find(|n| n.tag_name().name() == "manifest") {
        opf.manifest = manifest
            .children()
            .filter(|n| n.tag_name().name() == "item")
            .filter_map(|n| {
                let href = n.attribute("href")?.to_string();
                Some(ManifestItem {
                    id: n.attribute("id")?.to_string(),
                    full_path: resolve_target(opf_path, &href),
                    href,
                    media_type: n.attribute("media-type").unwrap_or_default().to_string(),
                    properties: n.attribute("properties").unwrap_or_default().to_string(),
                })
            })
            .collect();
    }

    if let Some(spine) = root.children().find(|n| n.tag_name().name() == "spine") {
        opf.toc_id = spine.attribute("toc").map(str::to_string);
        opf.spine = spine
            .children()
            .filter(|n| n.tag_name().name() == "itemref")
            .filter_map(|n| n.attribute("idref"))
            .map(str::to_string)
            .collect();
    }

    Ok(opf)
}

fn is_isbn_identifier(node: &Node) -> bool {
    let by_id = node.attribute("id").is_some_and(|id| id.eq_ignore_ascii_case("isbn"));
    let by_scheme = node
        .attributes()
        .any(|a| a.name() == "scheme" && a.value().eq_ignore_ascii_case("isbn"));
    let by_urn = node.text().is_some_and(|t| t.trim().starts_with("urn:isbn:"));
    by_id || by_scheme || by_urn
}

fn metadata_section(opf: &PackageDocument) -> MetadataSection {
    let mut section = MetadataSection::new("--- EPUB Metadata ---");
    section.push("Title", opf.title.as_deref().unwrap_or("Unknown"));
    if !opf.authors.is_empty() {
        section.push("Author(s)", opf.authors.join(", "));
    }
    section
        .push_opt("Language", opf.language.as_deref())
        .push_opt("ISBN", opf.isbn.as_deref())
        .push_opt("Publisher", opf.publisher.as_deref())
        .push_opt("Date", opf.date.as_deref());
    section
}

fn statistics_section(opf: &PackageDocument) -> MetadataSection {
    let count = |pred: &dyn Fn(&ManifestItem) -> bool| opf.manifest.iter().filter(|i| pred(i)).count();
    let mut section = MetadataSection::new("--- Document Statistics ---");
    section
        .push("Spine items", opf.spine.len())
        .push("Total items", opf.manifest.len())
        .push("HTML documents", count(&|i| i.media_type == XHTML_MEDIA_TYPE))
        .push("CSS stylesheets", count(&|i| i.media_type == "text/css"))
        .push("Images", count(&|i| i.media_type.starts_with("image/")));
    section
}

/// Table of contents lines, `{indent}• title`. Prefers the NCX; falls back to
/// the EPUB 3 navigation document. Unreadable navigation yields no lines.
fn table_of_contents<R: std::io::Read + std::io::Seek>(package: &mut Package<R>, opf: &PackageDocument) -> Vec<String> {
    let ncx = opf
        .toc_id
        .as_deref()
        .and_then(|id| opf.item(id))
        .or_else(|| opf.manifest.iter().find(|i| i.media_type == NCX_MEDIA_TYPE));
    if let Some(ncx) = ncx
        && let Some(xml) = package.read_optional(&ncx.full_path)
        && let Ok(doc) = roxmltree::Document::parse(&xml)
        && let Some(nav_map) = doc.descendants().find(|n| n.tag_name().name() == "navMap")
    {
        let mut lines = Vec::new();
        ncx_points(nav_map, 0, &mut lines);
        return lines;
    }

    let nav = opf
        .manifest
        .iter()
        .find(|i| i.properties.split_whitespace().any(|p| p == "nav"));
    if let Some(nav) = nav
        && let Some(xml) = package.read_optional(&nav.full_path)
        && let Ok(doc) = roxmltree::Document::parse(&xml)
        && let Some(toc) = doc.descendants().find(|n| {
            n.tag_name().name() == "nav"
                && n.attributes().any(|a| a.name() == "type" && a.value() == "toc")
        })
        && let Some(list) = toc.children().find(|n| n.tag_name().name() == "ol")
    {
        let mut lines = Vec::new();
        nav_items(list, 0, &mut lines);
        return lines;
    }

    Vec::new()
}

fn ncx_points(parent: Node, level: usize, lines: &mut Vec<String>) {
    for point in parent.children().filter(|n| n.tag_name().name() == "navPoint") {
        if let Some(label) = point
            .children()
            .find(|n| n.tag_name().name() == "navLabel")
            .and_then(|l| parse_xml_text(l, "text"))
        {
            lines.push(format!("{}• {}", "  ".repeat(level), label));
        }
        ncx_points(point, level + 1, lines);
    }
}

fn nav_items(list: Node, level: usize, lines: &mut Vec<String>) {
    for item in list.children().filter(|n| n.tag_name().name() == "li") {
        let label: String = item
            .children()
            .find(|n| matches!(n.tag_name().name(), "a" | "span"))
            .map(|a| a.descendants().filter(|d| d.is_text()).filter_map(|d| d.text()).collect())
            .unwrap_or_default();
        let label = label.trim();
        if !label.is_empty() {
            lines.push(format!("{}• {}", "  ".repeat(level), label));
        }
        if let Some(sub) = item.children().find(|n| n.tag_name().name() == "ol") {
            nav_items(sub, level + 1, lines);
        }
    }
}

/// One chapter unit, or `None` when the document holds neither title nor text.
fn chapter_unit<R: std::io::Read + std::io::Seek>(
    package: &mut Package<R>,
    item: &ManifestItem,
    index: usize,
    label: &str,
) -> Option<Unit> {
    let heading = format!("--- {}: {} ---", label, item.href);
    let parsed = package.read(&item.full_path).and_then(|bytes| {
        let source = String::from_utf8_lossy(&bytes);
        html_to_text(&source)
    });

    let mut unit = match parsed {
        Ok(html) => {
            if html.title.is_none() && html.text.is_empty() {
                return None;
            }
            let mut unit = Unit::new(UnitKind::Chapter, index, heading);
            if let Some(title) = html.title {
                unit.preamble.push(format!("Chapter: {}", title));
            }
            if !html.text.is_empty() {
                unit.push(ContentBlock::text(html.text));
            }
            unit
        }
        Err(e) => {
            tracing::warn!(document = %item.href, error = %e, "Failed to process EPUB document");
            Unit::failed(UnitKind::Chapter, index, heading, e.to_string())
        }
    };
    unit.trailer.push(SECTION_RULE.to_string());
    Some(unit)
}
