//! Page geometry from pdfium: words from character boxes, image object bounds.

use super::error::{PdfError, Result};
use super::words::Word;
use pdfium_render::prelude::*;

/// Characters separated by more than this (points) belong to different words.
const WORD_SPACING_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone)]
pub(crate) struct CharBox {
    pub ch: char,
    pub x: f64,
    /// Bottom edge, PDF coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PdfiumPage {
    pub width: f64,
    pub height: f64,
    pub words: Vec<Word>,
    /// `(top, x0)` of each image object, in page object order.
    pub image_positions: Vec<(f64, f64)>,
}

pub fn read_page(page: &PdfPage) -> Result<PdfiumPage> {
    let width = page.width().value as f64;
    let height = page.height().value as f64;

    let text = page
        .text()
        .map_err(|e| PdfError::TextExtractionFailed(format!("Failed to get page text: {}", e)))?;

    let mut chars = Vec::new();
    for pdf_char in text.chars().iter() {
        let Some(ch) = pdf_char.unicode_char() else {
            continue;
        };
        let bounds = pdf_char
            .loose_bounds()
            .map_err(|e| PdfError::TextExtractionFailed(format!("Failed to get char bounds: {}", e)))?;
        chars.push(CharBox {
            ch,
            x: bounds.left().value as f64,
            y: bounds.bottom().value as f64,
            width: bounds.width().value as f64,
            height: bounds.height().value as f64,
        });
    }

    let image_positions = page
        .objects()
        .iter()
        .filter(|object| object.object_type() == PdfPageObjectType::Image)
        .filter_map(|object| object.bounds().ok())
        .map(|bounds| (height - bounds.top().value as f64, bounds.left().value as f64))
        .collect();

    Ok(PdfiumPage {
        width,
        height,
        words: group_chars_into_words(&chars, height),
        image_positions,
    })
}

/// Group characters into words: whitespace, a line change or a wide gap ends a word.
pub(crate) fn group_chars_into_words(chars: &[CharBox], page_height: f64) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Vec<&CharBox> = Vec::new();

    for c in chars {
        if c.ch.is_whitespace() {
            flush(&mut current, page_height, &mut words);
            continue;
        }
        if let Some(last) = current.last() {
            let new_line = (c.y - last.y).abs() > last.height * 0.5;
            let gap = c.x - (last.x + last.width);
            if new_line || gap > WORD_SPACING_THRESHOLD {
                flush(&mut current, page_height, &mut words);
            }
        }
        current.push(c);
    }
    flush(&mut current, page_height, &mut words);
    words
}

fn flush(chars: &mut Vec<&CharBox>, page_height: f64, words: &mut Vec<Word>) {
    if chars.is_empty() {
        return;
    }
    let text: String = chars.iter().map(|c| c.ch).collect();
    let left = chars.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
    let right = chars.iter().map(|c| c.x + c.width).fold(f64::NEG_INFINITY, f64::max);
    let bottom = chars.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
    let top = chars.iter().map(|c| c.y + c.height).fold(f64::NEG_INFINITY, f64::max);
    chars.clear();

    // Flip to a top-left origin.
    words.push(Word::new(text, left, right, page_height - top, page_height - bottom));
}
