//! Zip package access shared by the OOXML and EPUB readers.
//!
//! Covers opening the container, reading parts, `_rels` relationship files,
//! and the Dublin Core properties in `docProps/core.xml`.

use crate::{DocsiftError, Result};
use roxmltree::Node;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const RELS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// An opened zip container.
pub struct Package<R: Read + Seek = File> {
    archive: ZipArchive<R>,
}

impl Package<File> {
    /// Open a package from disk.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be opened; `Parsing` when it is not a zip.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> Package<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        match ZipArchive::new(reader) {
            Ok(archive) => Ok(Self { archive }),
            Err(zip::result::ZipError::Io(io_err)) => Err(io_err.into()),
            Err(e) => Err(DocsiftError::parsing(format!("Failed to read archive (invalid format): {}", e))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    pub fn into_inner(self) -> R {
        self.archive.into_inner()
    }

    /// Names of all entries, in archive order.
    pub fn names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read one part.
    ///
    /// # Errors
    ///
    /// `Parsing` when the part is missing or unreadable.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.archive.by_name(name) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                Ok(contents)
            }
            Err(zip::result::ZipError::FileNotFound) => {
                Err(DocsiftError::parsing(format!("'{}' not found in archive", name)))
            }
            Err(zip::result::ZipError::Io(io_err)) => Err(io_err.into()),
            Err(e) => Err(DocsiftError::parsing(format!("Zip error reading '{}': {}", name, e))),
        }
    }

    /// Read one part as UTF-8 text.
    pub fn read_string(&mut self, name: &str) -> Result<String> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes).map_err(|e| DocsiftError::parsing(format!("Invalid UTF-8 in '{}': {}", name, e)))
    }

    /// Read an optional part; `None` when it is absent or unreadable.
    pub fn read_optional(&mut self, name: &str) -> Option<String> {
        if !self.contains(name) {
            return None;
        }
        self.read_string(name)
            .map_err(|e| tracing::debug!("Ignoring unreadable part: {}", e))
            .ok()
    }

    /// Relationships declared for `part`, or empty when it has none.
    pub fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>> {
        match self.read_optional(&rels_path_for(part)) {
            Some(xml) => parse_relationships(&xml),
            None => Ok(Vec::new()),
        }
    }

    /// Dublin Core properties from `docProps/core.xml`; default when absent.
    pub fn core_properties(&mut self) -> Result<CoreProperties> {
        match self.read_optional("docProps/core.xml") {
            Some(xml) => parse_core_properties(&xml),
            None => Ok(CoreProperties::default()),
        }
    }
}

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Last path segment of the relationship type, e.g. `image`, `chart`.
    pub fn kind(&self) -> &str {
        self.rel_type.rsplit('/').next().unwrap_or(&self.rel_type)
    }
}

pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type").unwrap_or_default().to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n.attribute("TargetMode") == Some("External"),
            })
        })
        .collect())
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declared it.
///
/// Absolute targets (leading `/`) are package-rooted; `..` segments pop.
pub fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Trimmed, non-empty text of the first descendant named `name`.
pub fn parse_xml_text(node: Node, name: &str) -> Option<String> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Concatenated `<a:t>` runs below `node`, one line per `<a:p>` paragraph.
pub fn drawingml_text(node: Node) -> String {
    let paragraphs: Vec<String> = node
        .descendants()
        .filter(|n| n.has_tag_name((DRAWINGML_NS, "p")))
        .map(|p| {
            p.descendants()
                .filter(|n| n.has_tag_name((DRAWINGML_NS, "t")))
                .filter_map(|t| t.text())
                .collect::<String>()
        })
        .collect();
    paragraphs.join("\n").trim().to_string()
}

/// Dublin Core metadata from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub category: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

pub fn parse_core_properties(xml: &str) -> Result<CoreProperties> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse core.xml: {}", e)))?;
    let root = doc.root_element();

    Ok(CoreProperties {
        title: parse_xml_text(root, "title"),
        subject: parse_xml_text(root, "subject"),
        creator: parse_xml_text(root, "creator"),
        keywords: parse_xml_text(root, "keywords"),
        description: parse_xml_text(root, "description"),
        last_modified_by: parse_xml_text(root, "lastModifiedBy"),
        category: parse_xml_text(root, "category"),
        created: parse_xml_text(root, "created"),
        modified: parse_xml_text(root, "modified"),
    })
}
