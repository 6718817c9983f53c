//! PowerPoint strategy.
//!
//! Slides are read in `presentation.xml` order. Each shape becomes a block at
//! its EMU offset, so the spatial reconstructor restores top-to-bottom,
//! left-to-right reading order. Title placeholders are lifted into the slide
//! preamble and speaker notes follow the content.

use super::run_blocking;
use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::PPTX_EXTENSIONS;
use crate::core::io::display_name;
use crate::extraction::ooxml::{
    CoreProperties, DRAWINGML_NS, Package, RELS_NS, Relationship, drawingml_text, resolve_target,
};
use crate::plugins::ExtractionStrategy;
use crate::types::{ContentBlock, Document, MetadataSection, TableGrid, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use roxmltree::Node;
use std::io::{Read, Seek};
use std::path::Path;

const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const PRESENTATION_PART: &str = "ppt/presentation.xml";
const EMU_PER_INCH: f64 = 914_400.0;

pub struct PptxNativeStrategy;

impl PptxNativeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PptxNativeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(PptxNativeStrategy, "pptx-native", "PowerPoint slides in spatial order");

#[async_trait]
impl ExtractionStrategy for PptxNativeStrategy {
    fn supported_extensions(&self) -> &[&str] {
        PPTX_EXTENSIONS
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("pptx-native", move || {
            let mut package = Package::open(&path)?;
            extract_pptx(&mut package, &display_name(&path), &options)
        })
        .await
    }
}

/// Slide order and size from `presentation.xml`.
struct Presentation {
    slide_paths: Vec<String>,
    /// Slide size in EMU.
    size: Option<(f64, f64)>,
}

fn extract_pptx<R: Read + Seek>(
    package: &mut Package<R>,
    file_name: &str,
    options: &ExtractionOptions,
) -> Result<Document> {
    let presentation = read_presentation(package)?;

    let core = package.core_properties().unwrap_or_else(|e| {
        tracing::debug!("Skipping presentation properties: {}", e);
        CoreProperties::default()
    });
    let mut properties = MetadataSection::new("--- Presentation Properties ---");
    properties
        .push("Filename", file_name)
        .push("Number of slides", presentation.slide_paths.len())
        .push_opt("Title", core.title.as_deref())
        .push_opt("Author", core.creator.as_deref())
        .push_opt("Subject", core.subject.as_deref())
        .push_opt("Keywords", core.keywords.as_deref());

    let mut document = Document::new();
    document.sections.push(properties);
    if options.metadata_only {
        return Ok(document);
    }

    for (idx, slide_path) in presentation.slide_paths.iter().enumerate() {
        let number = idx + 1;
        let heading = format!("--- Slide {} ---", number);
        let unit = match read_slide(package, slide_path, number, &heading, presentation.size, options) {
            Ok(unit) => unit,
            Err(e) => {
                tracing::warn!(slide = number, error = %e, "Failed to process slide");
                Unit::failed(UnitKind::Slide, number, heading, e.to_string())
            }
        };
        document.units.push(unit);
    }

    Ok(document)
}

fn read_presentation<R: Read + Seek>(package: &mut Package<R>) -> Result<Presentation> {
    let xml = package.read_string(PRESENTATION_PART)?;
    let doc = roxmltree::Document::parse(&xml)?;
    let rels = package.relationships(PRESENTATION_PART)?;

    let size = doc
        .descendants()
        .find(|n| n.has_tag_name((P_NS, "sldSz")))
        .and_then(|n| Some((n.attribute("cx")?.parse().ok()?, n.attribute("cy")?.parse().ok()?)));

    let mut slide_paths: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name((P_NS, "sldId")))
        .filter_map(|n| n.attribute((RELS_NS, "id")))
        .filter_map(|rid| rels.iter().find(|r| r.id == rid))
        .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
        .collect();

    if slide_paths.is_empty() {
        slide_paths = package
            .names()
            .into_iter()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .collect();
        slide_paths.sort_by_key(|name| slide_number(name));
    }

    Ok(Presentation { slide_paths, size })
}

fn slide_number(path: &str) -> u32 {
    path.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

/// Shape categories listed on the `Objects:` line, in display order.
#[derive(Debug, Default)]
struct ObjectCounts {
    text_boxes: usize,
    pictures: usize,
    charts: usize,
    tables: usize,
    diagrams: usize,
    media: usize,
    shapes: usize,
}

impl ObjectCounts {
    fn summary(&self) -> Option<String> {
        let parts: Vec<String> = [
            (self.text_boxes, "text boxes"),
            (self.pictures, "pictures"),
            (self.charts, "charts"),
            (self.tables, "tables"),
            (self.diagrams, "diagrams"),
            (self.media, "videos"),
            (self.shapes, "other shapes"),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();
        (!parts.is_empty()).then(|| format!("Objects: {}", parts.join(", ")))
    }
}

struct SlideParser<'o> {
    options: &'o ExtractionOptions,
    counts: ObjectCounts,
    title: Option<String>,
    blocks: Vec<ContentBlock>,
    /// Enclosing groups, outermost first.
    groups: Vec<GroupTransform>,
}

/// Maps a group's child coordinate space (`chOff`/`chExt`) onto its parent's
/// (`off`/`ext`).
#[derive(Debug, Clone, Copy, PartialEq)]
struct GroupTransform {
    off: (f64, f64),
    ext: (f64, f64),
    child_off: (f64, f64),
    child_ext: (f64, f64),
}

impl GroupTransform {
    fn read(group: Node) -> Option<Self> {
        let xfrm = group
            .children()
            .find(|n| n.has_tag_name((P_NS, "grpSpPr")))?
            .children()
            .find(|n| n.tag_name().name() == "xfrm")?;
        let pair = |name: &str, a: &str, b: &str| -> Option<(f64, f64)> {
            let node = xfrm.children().find(|n| n.tag_name().name() == name)?;
            Some((node.attribute(a)?.parse().ok()?, node.attribute(b)?.parse().ok()?))
        };
        let off = pair("off", "x", "y")?;
        let ext = pair("ext", "cx", "cy")?;
        Some(Self {
            off,
            ext,
            child_off: pair("chOff", "x", "y").unwrap_or(off),
            child_ext: pair("chExt", "cx", "cy").unwrap_or(ext),
        })
    }

    fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        let scale = |ext: f64, child: f64| if child > 0.0 { ext / child } else { 1.0 };
        (
            self.off.0 + (x - self.child_off.0) * scale(self.ext.0, self.child_ext.0),
            self.off.1 + (y - self.child_off.1) * scale(self.ext.1, self.child_ext.1),
        )
    }
}

fn read_slide<R: Read + Seek>(
    package: &mut Package<R>,
    slide_path: &str,
    number: usize,
    heading: &str,
    size: Option<(f64, f64)>,
    options: &ExtractionOptions,
) -> Result<Unit> {
    let xml = package.read_string(slide_path)?;
    let doc = roxmltree::Document::parse(&xml)?;
    let sp_tree = doc
        .descendants()
        .find(|n| n.has_tag_name((P_NS, "spTree")))
        .ok_or_else(|| DocsiftError::parsing(format!("No <p:spTree> in {}", slide_path)))?;

    let mut parser = SlideParser {
        options,
        counts: ObjectCounts::default(),
        title: None,
        blocks: Vec::new(),
        groups: Vec::new(),
    };
    for child in sp_tree.children().filter(Node::is_element) {
        parser.shape(child);
    }

    let mut unit = Unit::new(UnitKind::Slide, number, heading);
    if let Some((width, height)) = size {
        unit = unit.with_extent(width, height);
    }
    if let Some(title) = parser.title {
        unit.preamble.push(format!("Title: {}", title));
    }
    if let Some(summary) = parser.counts.summary() {
        unit.preamble.push(summary);
    }
    unit.blocks = parser.blocks;

    let rels = package.relationships(slide_path).unwrap_or_default();
    if let Some(notes) = notes_text(package, slide_path, &rels) {
        unit.trailer.push(format!("Notes: {}", notes));
    }

    Ok(unit)
}

impl SlideParser<'_> {
    fn shape(&mut self, node: Node) {
        if node.tag_name().namespace() != Some(P_NS) {
            return;
        }
        match node.tag_name().name() {
            "sp" => self.text_shape(node),
            "pic" => self.picture(node),
            "graphicFrame" => self.graphic_frame(node),
            "grpSp" => {
                let transform = GroupTransform::read(node);
                if let Some(transform) = transform {
                    self.groups.push(transform);
                }
                for child in node.children().filter(Node::is_element) {
                    self.shape(child);
                }
                if transform.is_some() {
                    self.groups.pop();
                }
            }
            "cxnSp" => self.other(node),
            _ => {}
        }
    }

    fn text_shape(&mut self, node: Node) {
        let text = node
            .children()
            .find(|n| n.has_tag_name((P_NS, "txBody")))
            .map(drawingml_text)
            .unwrap_or_default();
        if text.is_empty() {
            self.other(node);
            return;
        }
        if is_title_placeholder(node) && self.title.is_none() {
            self.title = Some(text.replace('\n', " "));
            return;
        }
        self.counts.text_boxes += 1;
        self.place(node, ContentBlock::text(text));
    }

    fn picture(&mut self, node: Node) {
        let is_media = node
            .descendants()
            .any(|n| matches!(n.tag_name().name(), "videoFile" | "audioFile" | "media" | "quickTimeFile"));
        if is_media {
            self.counts.media += 1;
            let descriptor = format!("[Media: {}]", shape_name(node).unwrap_or("media"));
            self.place(node, ContentBlock::media(descriptor));
            return;
        }

        self.counts.pictures += 1;
        if !self.options.office.extract_images {
            return;
        }
        let descriptor = match extent(node) {
            Some((cx, cy)) => format!("[Picture: {:.2}\" × {:.2}\"]", cx / EMU_PER_INCH, cy / EMU_PER_INCH),
            None => "[Picture]".to_string(),
        };
        self.place(node, ContentBlock::image(descriptor));
    }

    fn graphic_frame(&mut self, node: Node) {
        let Some(data) = node.descendants().find(|n| n.has_tag_name((DRAWINGML_NS, "graphicData"))) else {
            self.other(node);
            return;
        };
        let uri = data.attribute("uri").unwrap_or_default();

        if uri.ends_with("/table") {
            self.counts.tables += 1;
            if !self.options.office.extract_tables {
                return;
            }
            if let Some(tbl) = data.children().find(|n| n.has_tag_name((DRAWINGML_NS, "tbl"))) {
                let grid = table_grid(tbl);
                if !grid.is_empty() {
                    self.place(node, ContentBlock::table(grid));
                }
            }
        } else if uri.ends_with("/chart") {
            self.counts.charts += 1;
            self.place(node, ContentBlock::chart("[Chart]"));
        } else if uri.ends_with("/diagram") {
            self.counts.diagrams += 1;
            self.place(node, ContentBlock::drawing("[Diagram]"));
        } else {
            self.other(node);
        }
    }

    fn other(&mut self, node: Node) {
        self.counts.shapes += 1;
        let descriptor = format!("[Shape: {}]", shape_name(node).unwrap_or("unnamed"));
        self.place(node, ContentBlock::shape(descriptor));
    }

    /// Position `block` at the shape's offset in slide coordinates.
    fn place(&mut self, node: Node, block: ContentBlock) {
        let slide_offset = offset(node).map(|local| self.groups.iter().rev().fold(local, |at, g| g.apply(at)));
        let block = match slide_offset {
            Some((x, y)) => block.at(y, x),
            None => block,
        };
        self.blocks.push(block);
    }
}

fn is_title_placeholder(sp: Node) -> bool {
    sp.descendants()
        .find(|n| n.has_tag_name((P_NS, "ph")))
        .and_then(|ph| ph.attribute("type"))
        .is_some_and(|t| t == "title" || t == "ctrTitle")
}

fn shape_name<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.descendants()
        .find(|n| n.has_tag_name((P_NS, "cNvPr")))
        .and_then(|n| n.attribute("name"))
        .filter(|name| !name.is_empty())
}

/// First `xfrm` of the shape; `a:xfrm` for shapes, `p:xfrm` for graphic frames.
fn xfrm<'a, 'i>(node: Node<'a, 'i>) -> Option<Node<'a, 'i>> {
    node.descendants().find(|n| n.tag_name().name() == "xfrm")
}

/// `(x, y)` offset in EMU.
fn offset(node: Node) -> Option<(f64, f64)> {
    let off = xfrm(node)?.children().find(|n| n.tag_name().name() == "off")?;
    Some((off.attribute("x")?.parse().ok()?, off.attribute("y")?.parse().ok()?))
}

/// `(cx, cy)` extent in EMU.
fn extent(node: Node) -> Option<(f64, f64)> {
    let ext = xfrm(node)?.children().find(|n| n.tag_name().name() == "ext")?;
    Some((ext.attribute("cx")?.parse().ok()?, ext.attribute("cy")?.parse().ok()?))
}

fn table_grid(tbl: Node) -> TableGrid {
    let rows = tbl
        .children()
        .filter(|n| n.has_tag_name((DRAWINGML_NS, "tr")))
        .map(|tr| {
            tr.children()
                .filter(|n| n.has_tag_name((DRAWINGML_NS, "tc")))
                .map(drawingml_text)
                .collect()
        })
        .collect();
    TableGrid::new(rows, true)
}

/// Body text of the slide's notes page, if it has one.
fn notes_text<R: Read + Seek>(package: &mut Package<R>, slide_path: &str, rels: &[Relationship]) -> Option<String> {
    let rel = rels.iter().find(|r| r.kind() == "notesSlide")?;
    let xml = package.read_optional(&resolve_target(slide_path, &rel.target))?;
    let doc = roxmltree::Document::parse(&xml).ok()?;

    let text: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name((P_NS, "sp")))
        .filter(|sp| {
            sp.descendants()
                .find(|n| n.has_tag_name((P_NS, "ph")))
                .is_some_and(|ph| ph.attribute("type") == Some("body"))
        })
        .map(drawingml_text)
        .filter(|t| !t.is_empty())
        .collect();

    (!text.is_empty()).then(|| text.join("\n"))
}
