use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Position of a block inside its unit, in the container's native coordinate
/// system (points for PDF, EMU for slides, synthetic indexes elsewhere).
///
/// `y` grows downwards. Backends with a bottom-left origin flip before
/// constructing a `Position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub y: f64,
    pub x: f64,
}

impl Position {
    pub fn new(y: f64, x: f64) -> Self {
        Self { y, x }
    }
}

/// Closed set of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Image,
    Table,
    Chart,
    Shape,
    Media,
    Drawing,
}

/// Payload of a block. Non-text variants carry the bracketed descriptor that
/// is emitted verbatim in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum BlockContent {
    Text(String),
    Image(String),
    Table(TableGrid),
    Chart(String),
    Shape(String),
    Media(String),
    Drawing(String),
}

/// Atomic positioned unit of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub content: BlockContent,
    /// `None` when the backend cannot report where the block sits.
    pub position: Option<Position>,
}

impl ContentBlock {
    pub fn new(content: BlockContent) -> Self {
        Self {
            content,
            position: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(BlockContent::Text(text.into()))
    }

    pub fn image(descriptor: impl Into<String>) -> Self {
        Self::new(BlockContent::Image(descriptor.into()))
    }

    pub fn table(grid: TableGrid) -> Self {
        Self::new(BlockContent::Table(grid))
    }

    pub fn chart(descriptor: impl Into<String>) -> Self {
        Self::new(BlockContent::Chart(descriptor.into()))
    }

    pub fn shape(descriptor: impl Into<String>) -> Self {
        Self::new(BlockContent::Shape(descriptor.into()))
    }

    pub fn media(descriptor: impl Into<String>) -> Self {
        Self::new(BlockContent::Media(descriptor.into()))
    }

    pub fn drawing(descriptor: impl Into<String>) -> Self {
        Self::new(BlockContent::Drawing(descriptor.into()))
    }

    /// Builder-style position setter.
    pub fn at(mut self, y: f64, x: f64) -> Self {
        self.position = Some(Position::new(y, x));
        self
    }

    pub fn kind(&self) -> BlockKind {
        match &self.content {
            BlockContent::Text(_) => BlockKind::Text,
            BlockContent::Image(_) => BlockKind::Image,
            BlockContent::Table(_) => BlockKind::Table,
            BlockContent::Chart(_) => BlockKind::Chart,
            BlockContent::Shape(_) => BlockKind::Shape,
            BlockContent::Media(_) => BlockKind::Media,
            BlockContent::Drawing(_) => BlockKind::Drawing,
        }
    }
}

/// Row-major grid of cell strings.
///
/// Column widths are the widest line of any cell in the column, measured in
/// characters; the renderer caps them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableGrid {
    pub rows: Vec<Vec<String>>,
    pub has_header: bool,
    pub column_widths: Vec<usize>,
}

impl TableGrid {
    pub fn new(rows: Vec<Vec<String>>, has_header: bool) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut column_widths = vec![0; columns];
        for row in &rows {
            for (idx, cell) in row.iter().enumerate() {
                let widest = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                column_widths[idx] = column_widths[idx].max(widest);
            }
        }
        Self {
            rows,
            has_header,
            column_widths,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }
}

/// What a unit represents; selects the empty-unit placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Page,
    Slide,
    Sheet,
    Chapter,
    Body,
}

impl UnitKind {
    pub fn empty_placeholder(self) -> &'static str {
        match self {
            UnitKind::Page => "[This page appears to be empty or contains only non-text elements]",
            UnitKind::Slide => "[This slide appears to have no text content or contains only non-text elements]",
            UnitKind::Sheet => "[This sheet appears to be empty]",
            UnitKind::Chapter | UnitKind::Body => "[This document appears to be empty]",
        }
    }
}

/// One linear unit of content: a page, slide, sheet or chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub kind: UnitKind,
    /// 1-based position of the unit in its container.
    pub index: usize,
    /// Boundary marker such as `--- Page 3 ---`; empty for headless units.
    pub heading: String,
    /// Lines emitted between the heading and the reconstructed content.
    pub preamble: Vec<String>,
    pub blocks: Vec<ContentBlock>,
    /// Lines emitted after the content.
    pub trailer: Vec<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Set when processing this unit failed; rendered as an inline marker.
    pub error: Option<String>,
}

impl Unit {
    pub fn new(kind: UnitKind, index: usize, heading: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            heading: heading.into(),
            preamble: Vec::new(),
            blocks: Vec::new(),
            trailer: Vec::new(),
            width: None,
            height: None,
            error: None,
        }
    }

    pub fn with_extent(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn push(&mut self, block: ContentBlock) {
        self.blocks.push(block);
    }

    /// Unit that failed to process; the rest of the document is unaffected.
    pub fn failed(kind: UnitKind, index: usize, heading: impl Into<String>, error: impl Into<String>) -> Self {
        let mut unit = Self::new(kind, index, heading);
        let error = crate::DocsiftError::Unit {
            index,
            message: error.into(),
        };
        unit.error = Some(error.to_string());
        unit
    }
}

/// `Key: Value` preamble block with a header and a closing rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataSection {
    /// Header line such as `--- Document Properties ---`.
    pub title: String,
    pub entries: IndexMap<String, String>,
    /// Free-form lines emitted after the entries (table of contents, notes).
    pub lines: Vec<String>,
}

/// Extracted document: preamble sections followed by ordered units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub sections: Vec<MetadataSection>,
    /// Marker emitted between the preamble and the first unit.
    pub body_heading: Option<String>,
    pub units: Vec<Unit>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary document properties (the first preamble section).
    pub fn metadata(&self) -> Option<&IndexMap<String, String>> {
        self.sections.first().map(|s| &s.entries)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

/// Outcome of one extraction call. Callers check `success` before `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub file_path: String,
    /// Lowercase extension with a leading dot, e.g. `.pdf`.
    pub file_type: String,
    #[serde(default)]
    pub summarized: bool,
}

impl ExtractionResult {
    pub fn success(file_path: impl Into<String>, file_type: impl Into<String>, content: String) -> Self {
        Self {
            success: true,
            content: Some(content),
            error: None,
            file_path: file_path.into(),
            file_type: file_type.into(),
            summarized: false,
        }
    }

    pub fn failure(file_path: impl Into<String>, file_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
            file_path: file_path.into(),
            file_type: file_type.into(),
            summarized: false,
        }
    }
}
