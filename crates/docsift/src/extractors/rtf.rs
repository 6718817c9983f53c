//! RTF strategies: `rtf-parser` first, a control-word stripper as fallback.

use super::{LAST_RESORT, PRIMARY, run_blocking};
use crate::core::capabilities::Capabilities;
use crate::core::config::ExtractionOptions;
use crate::core::formats::RTF_EXTENSIONS;
use crate::core::io::{display_name, read_file_sync};
use crate::plugins::ExtractionStrategy;
use crate::render::SECTION_RULE;
use crate::types::{ContentBlock, Document, MetadataSection, Unit, UnitKind};
use crate::{DocsiftError, Result};
use async_trait::async_trait;
use encoding_rs::WINDOWS_1252;
use rtf_parser::document::RtfDocument;
use std::path::Path;

/// Parses with the `rtf-parser` crate.
pub struct RtfParserStrategy;

impl RtfParserStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RtfParserStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(RtfParserStrategy, "rtf-parser", "RTF through the rtf-parser crate");

#[async_trait]
impl ExtractionStrategy for RtfParserStrategy {
    fn supported_extensions(&self) -> &[&str] {
        RTF_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        PRIMARY
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let metadata_only = options.metadata_only;
        run_blocking("rtf-parser", move || {
            rtf_document(&path, metadata_only, |source| {
                let document = RtfDocument::try_from(source)
                    .map_err(|e| DocsiftError::backend("rtf-parser", format!("{:?}", e)))?;
                Ok(document.get_text())
            })
        })
        .await
    }
}

/// Strips control words and destination groups by hand.
pub struct RtfNativeStrategy;

impl RtfNativeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RtfNativeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

builtin_plugin!(RtfNativeStrategy, "rtf-native", "RTF control-word stripper");

#[async_trait]
impl ExtractionStrategy for RtfNativeStrategy {
    fn supported_extensions(&self) -> &[&str] {
        RTF_EXTENSIONS
    }

    fn priority(&self) -> i32 {
        LAST_RESORT
    }

    async fn extract(&self, path: &Path, options: &ExtractionOptions, _caps: &Capabilities) -> Result<Document> {
        let path = path.to_path_buf();
        let metadata_only = options.metadata_only;
        run_blocking("rtf-native", move || rtf_document(&path, metadata_only, strip_rtf)).await
    }
}

fn rtf_document(
    path: &Path,
    metadata_only: bool,
    to_text: impl FnOnce(&str) -> Result<String>,
) -> Result<Document> {
    let bytes = read_file_sync(path)?;
    let source = String::from_utf8_lossy(&bytes);
    if !source.trim_start().starts_with("{\\rtf") {
        return Err(DocsiftError::parsing("missing {\\rtf header"));
    }

    let heading = format!("--- RTF Document: {} ---", display_name(path));
    let size = format!("{:.2} KB", bytes.len() as f64 / 1024.0);
    if metadata_only {
        let mut section = MetadataSection::new(heading);
        section.push("Size", size);
        return Ok(Document {
            sections: vec![section],
            ..Document::default()
        });
    }

    let mut unit = Unit::new(UnitKind::Body, 1, heading);
    unit.preamble.push(format!("Size: {}", size));
    unit.preamble.push(SECTION_RULE.to_string());
    let text = to_text(&source)?;
    let text = text.trim();
    if !text.is_empty() {
        unit.push(ContentBlock::text(text));
    }

    Ok(Document {
        units: vec![unit],
        ..Document::default()
    })
}

/// Destinations whose content is never body text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
    "revtbl",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
];

#[derive(Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Fallback characters to drop after a `\u` escape (`\ucN`).
    unicode_skip: usize,
}

/// Plain text of an RTF source.
///
/// # Errors
///
/// `Parsing` when braces are unbalanced.
pub fn strip_rtf(source: &str) -> Result<String> {
    let mut out = String::new();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState {
        skip: false,
        unicode_skip: 1,
    };
    let mut pending_skip = 0usize;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                stack.push(state);
                pending_skip = 0;
            }
            '}' => {
                state = stack
                    .pop()
                    .ok_or_else(|| DocsiftError::parsing("unbalanced '}' in RTF"))?;
                pending_skip = 0;
            }
            '\\' => {
                let Some(&next) = chars.peek() else { break };
                match next {
                    '\\' | '{' | '}' => {
                        chars.next();
                        emit(&mut out, &state, &mut pending_skip, next);
                    }
                    '\'' => {
                        chars.next();
                        let hex: String = chars.by_ref().take(2).collect();
                        if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                            let buf = [byte];
                            let (decoded, _, _) = WINDOWS_1252.decode(&buf);
                            for c in decoded.chars() {
                                emit(&mut out, &state, &mut pending_skip, c);
                            }
                        }
                    }
                    '*' => {
                        chars.next();
                        state.skip = true;
                    }
                    '~' => {
                        chars.next();
                        emit(&mut out, &state, &mut pending_skip, '\u{00A0}');
                    }
                    '-' | '_' => {
                        chars.next();
                    }
                    '\n' | '\r' => {
                        chars.next();
                        if !state.skip {
                            out.push('\n');
                        }
                    }
                    _ => {
                        let (word, param) = control_word(&mut chars);
                        match word.as_str() {
                            "par" | "line" | "row" | "sect" | "page" if !state.skip => out.push('\n'),
                            "tab" | "cell" if !state.skip => out.push('\t'),
                            "bullet" if !state.skip => out.push('\u{2022}'),
                            "emdash" if !state.skip => out.push('\u{2014}'),
                            "endash" if !state.skip => out.push('\u{2013}'),
                            "lquote" if !state.skip => out.push('\u{2018}'),
                            "rquote" if !state.skip => out.push('\u{2019}'),
                            "ldblquote" if !state.skip => out.push('\u{201C}'),
                            "rdblquote" if !state.skip => out.push('\u{201D}'),
                            "uc" => state.unicode_skip = param.unwrap_or(1).max(0) as usize,
                            "u" => {
                                if let Some(code) = param {
                                    let code = if code < 0 { code + 65536 } else { code };
                                    if let Some(c) = char::from_u32(code as u32)
                                        && !state.skip
                                    {
                                        out.push(c);
                                    }
                                    pending_skip = state.unicode_skip;
                                }
                            }
                            w if SKIPPED_DESTINATIONS.contains(&w) => state.skip = true,
                            _ => {}
                        }
                    }
                }
            }
            '\r' | '\n' => {}
            c => emit(&mut out, &state, &mut pending_skip, c),
        }
    }

    if !stack.is_empty() {
        tracing::debug!(open = stack.len(), "RTF ended with unclosed groups");
    }
    Ok(out)
}

fn emit(out: &mut String, state: &GroupState, pending_skip: &mut usize, c: char) {
    if *pending_skip > 0 {
        *pending_skip -= 1;
        return;
    }
    if !state.skip {
        out.push(c);
    }
}

/// Control word and optional numeric parameter; consumes one delimiting space.
fn control_word(chars: &mut std::iter::Peekable<std::str::Chars>) -> (String, Option<i32>) {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphabetic() {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }

    let mut digits = String::new();
    if chars.peek() == Some(&'-') {
        digits.push('-');
        chars.next();
    }
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if chars.peek() == Some(&' ') {
        chars.next();
    }

    (word, digits.parse().ok())
}
