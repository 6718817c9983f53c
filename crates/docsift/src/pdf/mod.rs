//! PDF internals behind the three PDF strategies.
//!
//! - [`pdfium`]: character and image-object geometry through pdfium
//! - [`content_stream`]: a lopdf content-stream interpreter for the same data
//! - [`words`] and [`table`]: line, paragraph and table reconstruction shared by both
//! - [`objects`]: lopdf object-graph lookups (XObjects, annotations, page boxes)
//! - [`metadata`]: the `--- Document Metadata ---` section
//! - [`tabula`]: optional table extraction through the tabula jar
//!
//! Requires the `pdf` feature.

pub mod bindings;
pub mod content_stream;
pub mod error;
pub mod metadata;
pub mod objects;
pub mod page;
pub mod pdfium;
pub mod table;
pub mod tabula;
pub mod words;

pub use error::PdfError;
pub use metadata::PdfSummary;
pub use page::{PageContent, PageImage, PageTable};
