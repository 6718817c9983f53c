//! PDF strategies.
//!
//! Three backends in descending fidelity:
//!
//! - `pdf-layout`: pdfium character geometry, image object bounds and
//!   stream-mode table detection
//! - `pdf-structural`: the lopdf content-stream interpreter, with tabula
//!   tables when a JVM and the jar are available
//! - `pdf-minimal`: lopdf's own text extraction plus XObject counts
//!
//! All three emit the same metadata section and page headings, so callers
//! see the same shape whichever backend succeeded.

use super::{LAST_RESORT, PRIMARY, SECONDARY, run_blocking};
use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::PDF_EXTENSIONS;
use crate::core::io::{display_name, read_file_sync};
use crate::pdf::bindings::bind_pdfium;
use crate::pdf::content_stream::interpret_page;
use crate::pdf::error::{PdfError, load_error};
use crate::pdf::metadata::{summary_from_lopdf, summary_from_pdfium};
use crate::pdf::objects::{XObjectInfo, XObjectKind, annotation_counts, page_size, page_xobjects};
use crate::pdf::page::{PageContent, PageImage, contains_marker, failed_page, page_heading};
use crate::pdf::pdfium::read_page;
use crate::pdf::tabula::{self, PageTables};
use crate::plugins::ExtractionStrategy;
use crate::types::{ContentBlock, Document, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use lopdf::{Document as LopdfDocument, ObjectId};
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::Path;

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

fn load_lopdf(bytes: &[u8]) -> std::result::Result<LopdfDocument, PdfError> {
    LopdfDocument::load_mem(bytes).map_err(|e| match e {
        lopdf::Error::IO(io) => PdfError::IOError(io.to_string()),
        other => load_error(other.to_string()),
    })
}

fn images_on_page(xobjects: &[XObjectInfo]) -> Vec<(&str, PageImage)> {
    xobjects
        .iter()
        .filter_map(|x| match x.kind {
            XObjectKind::Image { width, height, format } => Some((
                x.name.as_str(),
                PageImage {
                    width,
                    height,
                    format,
                    position: None,
                },
            )),
            _ => None,
        })
        .collect()
}

pub struct PdfLayoutStrategy;

impl PdfLayoutStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfLayoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(PdfLayoutStrategy, "pdf-layout", "PDF pages in reading order through pdfium");

#[async_trait]
impl ExtractionStrategy for PdfLayoutStrategy {
    fn supported_extensions(&self) -> &[&str] {
        PDF_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        PRIMARY
    }

    fn is_available(&self, caps: &Capabilities) -> bool {
        caps.pdfium
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("pdf-layout", move || extract_layout(&path, &options)).await
    }
}

fn extract_layout(path: &Path, options: &ExtractionOptions) -> Result<Document> {
    let bytes = read_file_sync(path)?;
    let pdfium = Pdfium::new(bind_pdfium("pdf-layout")?);
    let document = pdfium
        .load_pdf_from_byte_slice(&bytes, None)
        .map_err(|e| load_error(e.to_string()))?;

    let mut doc = Document::new();
    doc.sections
        .push(summary_from_pdfium(&document, &display_name(path)).section());
    if options.metadata_only {
        return Ok(doc);
    }

    // Image sizes and annotations come from the object graph; without it the
    // pages still carry their text.
    let objects = match load_lopdf(&bytes) {
        Ok(lo) => Some(lo),
        Err(e) => {
            tracing::debug!("lopdf could not read the object graph: {}", e);
            None
        }
    };
    let page_ids: Vec<ObjectId> = objects
        .as_ref()
        .map(|lo| lo.get_pages().into_values().collect())
        .unwrap_or_default();

    for (idx, page) in document.pages().iter().enumerate() {
        let number = idx + 1;
        let graph = objects.as_ref().zip(page_ids.get(idx).copied());
        let unit = match layout_page(&page, number, graph) {
            Ok(content) => content.into_unit(&options.pdf),
            Err(e) => {
                tracing::warn!(page = number, "Failed to process page: {}", e);
                failed_page(number, e.to_string())
            }
        };
        doc.units.push(unit);
    }
    Ok(doc)
}

fn layout_page(
    page: &PdfPage,
    number: usize,
    graph: Option<(&LopdfDocument, ObjectId)>,
) -> std::result::Result<PageContent, PdfError> {
    let geometry = read_page(page)?;
    let mut content = PageContent {
        number,
        width: geometry.width,
        height: geometry.height,
        words: geometry.words,
        ..Default::default()
    };

    if let Some((lo, page_id)) = graph {
        // pdfium lists image objects in paint order; pair them with the
        // declared XObjects by index.
        content.images = images_on_page(&page_xobjects(lo, page_id))
            .into_iter()
            .enumerate()
            .map(|(idx, (_, mut image))| {
                image.position = geometry.image_positions.get(idx).copied();
                image
            })
            .collect();
        (content.links, content.annotations) = annotation_counts(lo, page_id);
    }
    Ok(content)
}

pub struct PdfStructuralStrategy;

impl PdfStructuralStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfStructuralStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(
    PdfStructuralStrategy,
    "pdf-structural",
    "PDF pages from the content streams, with tabula tables"
);

#[async_trait]
impl ExtractionStrategy for PdfStructuralStrategy {
    fn supported_extensions(&self) -> &[&str] {
        PDF_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        SECONDARY
    }

    fn is_available(&self, caps: &Capabilities) -> bool {
        caps.pdf
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, caps: &Capabilities) -> Result<Document> {
        let tables = match (&caps.java, &caps.tabula_jar) {
            (Some(java), Some(jar))
                if options.pdf.use_tabula && options.pdf.extract_tables && !options.metadata_only =>
            {
                match tabula::extract_tables(java, jar, path, options.subprocess_timeout_secs).await {
                    Ok(tables) => Some(tables),
                    Err(err @ DocsiftError::Timeout { .. }) => return Err(err),
                    Err(e) => {
                        tracing::warn!("tabula failed, detecting tables from text instead: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("pdf-structural", move || extract_structural(&path, &options, tables)).await
    }
}

fn extract_structural(path: &Path, options: &ExtractionOptions, mut tables: Option<PageTables>) -> Result<Document> {
    let bytes = read_file_sync(path)?;
    let lo = load_lopdf(&bytes)?;

    let mut doc = Document::new();
    doc.sections.push(summary_from_lopdf(&lo, &display_name(path)).section());
    if options.metadata_only {
        return Ok(doc);
    }

    for (idx, page_id) in lo.get_pages().into_values().enumerate() {
        let number = idx + 1;
        let page_tables = tables.as_mut().and_then(|t| t.remove(&number));
        let unit = match structural_page(&lo, page_id, number) {
            Ok(mut content) => {
                if let Some(found) = page_tables {
                    content.tables = found;
                }
                content.into_unit(&options.pdf)
            }
            Err(e) => {
                tracing::warn!(page = number, "Failed to process page: {}", e);
                failed_page(number, e.to_string())
            }
        };
        doc.units.push(unit);
    }
    Ok(doc)
}

fn structural_page(
    lo: &LopdfDocument,
    page_id: ObjectId,
    number: usize,
) -> std::result::Result<PageContent, PdfError> {
    let (width, height) = page_size(lo, page_id);
    let layout = interpret_page(lo, page_id, height)?;

    let images = images_on_page(&page_xobjects(lo, page_id))
        .into_iter()
        .map(|(name, mut image)| {
            image.position = layout
                .placements
                .iter()
                .find(|p| p.name == name)
                .map(|p| (p.top, p.x0));
            image
        })
        .collect();
    let (links, annotations) = annotation_counts(lo, page_id);

    Ok(PageContent {
        number,
        width,
        height,
        words: layout.words,
        tables: Vec::new(),
        images,
        links,
        annotations,
    })
}

pub struct PdfMinimalStrategy;

impl PdfMinimalStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfMinimalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(PdfMinimalStrategy, "pdf-minimal", "PDF page text without layout");

#[async_trait]
impl ExtractionStrategy for PdfMinimalStrategy {
    fn supported_extensions(&self) -> &[&str] {
        PDF_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        LAST_RESORT
    }

    fn is_available(&self, caps: &Capabilities) -> bool {
        caps.pdf
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let options = options.clone();
        run_blocking("pdf-minimal", move || extract_minimal(&path, &options)).await
    }
}

fn extract_minimal(path: &Path, options: &ExtractionOptions) -> Result<Document> {
    let bytes = read_file_sync(path)?;
    let lo = load_lopdf(&bytes)?;

    let mut doc = Document::new();
    doc.sections.push(summary_from_lopdf(&lo, &display_name(path)).section());
    if options.metadata_only {
        return Ok(doc);
    }

    for (idx, (page_number, page_id)) in lo.get_pages().into_iter().enumerate() {
        let number = idx + 1;
        let unit = match lo.extract_text(&[page_number]) {
            Ok(text) => minimal_page(&lo, page_id, number, &text),
            Err(e) => {
                tracing::warn!(page = number, "Failed to extract page text: {}", e);
                failed_page(number, e.to_string())
            }
        };
        doc.units.push(unit);
    }
    Ok(doc)
}

fn minimal_page(lo: &LopdfDocument, page_id: ObjectId, number: usize, text: &str) -> Unit {
    let mut unit = Unit::new(UnitKind::Page, number, page_heading(number));
    for para in BLANK_LINES.split(text) {
        let joined = para
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            unit.push(ContentBlock::text(joined));
        }
    }

    let xobjects = page_xobjects(lo, page_id);
    let images = xobjects
        .iter()
        .filter(|x| matches!(x.kind, XObjectKind::Image { .. }))
        .count();
    let forms = xobjects.iter().filter(|x| x.kind == XObjectKind::Form).count();
    if images > 0 {
        unit.trailer.push(contains_marker(images, "image", "images"));
    }
    if forms > 0 {
        unit.trailer.push(contains_marker(forms, "form object", "form objects"));
    }
    unit
}
