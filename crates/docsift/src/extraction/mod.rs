//! Format-independent helpers used by the strategies.
//!
//! - [`encoding`]: decoding ladders and the binary-content check
//! - [`ooxml`]: zip package access, relationships, core properties
//! - [`html`]: (X)HTML to plain text

pub mod encoding;

#[cfg(feature = "office")]
pub mod ooxml;

#[cfg(feature = "html")]
pub mod html;

pub use encoding::{TextEncoding, decode_text, decode_with, looks_like_text};

#[cfg(feature = "office")]
pub use ooxml::{CoreProperties, Package, Relationship, parse_xml_text, resolve_target};

#[cfg(feature = "html")]
pub use html::{HtmlText, html_to_text};
