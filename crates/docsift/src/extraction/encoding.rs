//! Byte-to-text decoding ladders.
//!
//! Plain text tries UTF-8, strict ISO-8859-1, Windows-1252 and ASCII in that
//! order; delimited text tries UTF-8 with BOM, UTF-8, ISO-8859-1 and
//! Windows-1252. Either ladder ends in lossy UTF-8 through [`decode_lossy`].

use crate::{DocsiftError, Result};
use encoding_rs::{UTF_8, WINDOWS_1252};

/// Encodings a decoder can report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8Sig,
    Utf8,
    Latin1,
    Windows1252,
    Ascii,
    Utf8Lossy,
}

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Utf8Lossy => "utf-8 (lossy)",
        }
    }

    /// Strict decode; `None` when the bytes are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8Sig => bytes
                .strip_prefix(b"\xEF\xBB\xBF")
                .and_then(|rest| std::str::from_utf8(rest).ok())
                .map(str::to_string),
            TextEncoding::Utf8 => {
                let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
                (!had_errors).then(|| text.into_owned())
            }
            TextEncoding::Latin1 => decode_latin1_strict(bytes),
            TextEncoding::Windows1252 => {
                if bytes.iter().any(|b| WINDOWS_1252_UNDEFINED.contains(b)) {
                    return None;
                }
                let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
                (!had_errors).then(|| text.into_owned())
            }
            TextEncoding::Ascii => bytes.is_ascii().then(|| String::from_utf8_lossy(bytes).into_owned()),
            TextEncoding::Utf8Lossy => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Code points left unassigned by Windows-1252. encoding_rs maps them to C1
/// controls; they are treated as invalid here.
const WINDOWS_1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

pub const TEXT_LADDER: &[TextEncoding] = &[
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
    TextEncoding::Ascii,
];

pub const CSV_LADDER: &[TextEncoding] = &[
    TextEncoding::Utf8Sig,
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
];

/// ISO-8859-1 proper: the C1 range 0x80-0x9F is rejected so that
/// Windows-1252 punctuation falls through to the next rung.
///
/// encoding_rs maps the `latin1` label to Windows-1252, so this is done by hand.
fn decode_latin1_strict(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
        return None;
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

/// First rung of `ladder` that decodes cleanly.
///
/// # Errors
///
/// `DocsiftError::Encoding` when every rung rejects the bytes.
pub fn decode_with(bytes: &[u8], ladder: &[TextEncoding]) -> Result<(String, TextEncoding)> {
    for encoding in ladder {
        if let Some(text) = encoding.decode(bytes) {
            return Ok((text, *encoding));
        }
    }
    Err(DocsiftError::Encoding {
        message: format!(
            "could not decode with any of: {}",
            ladder.iter().map(|e| e.label()).collect::<Vec<_>>().join(", ")
        ),
    })
}

/// `ladder` with lossy UTF-8 as last resort. Never fails.
pub fn decode_lossy(bytes: &[u8], ladder: &[TextEncoding]) -> (String, TextEncoding) {
    match decode_with(bytes, ladder) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!("{}; decoding lossily", e);
            (String::from_utf8_lossy(bytes).into_owned(), TextEncoding::Utf8Lossy)
        }
    }
}

/// Plain-text ladder with lossy UTF-8 as last resort.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    decode_lossy(bytes, TEXT_LADDER)
}

/// Control characters other than tab/newline/carriage return/form feed
/// tolerated in text of unknown type, as a fraction of all bytes.
pub const MAX_CONTROL_RATIO: f64 = 0.10;

/// Heuristic used for files whose extension is not registered.
///
/// Rejects NUL bytes, known binary signatures, and a high ratio of control
/// characters.
pub fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }
    if memchr::memchr(0, bytes).is_some() {
        return false;
    }
    if let Some(kind) = infer::get(bytes)
        && kind.matcher_type() != infer::MatcherType::Text
    {
        return false;
    }
    let controls = bytes
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C)) || b == 0x7F)
        .count();
    (controls as f64 / bytes.len() as f64) <= MAX_CONTROL_RATIO
}
