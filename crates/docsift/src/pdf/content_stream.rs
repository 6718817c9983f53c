//! Minimal content-stream interpreter over lopdf.
//!
//! Tracks just enough graphics and text state to place shown text and
//! painted XObjects on the page. Glyph widths are not read from font
//! programs; every glyph advances half the font size, which is close enough
//! for ordering blocks and splitting table columns.

use super::error::{PdfError, Result};
use super::objects::{decode_pdf_string, number};
use super::words::Word;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use std::collections::BTreeMap;

/// Estimated glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.5;

/// A `TJ` adjustment beyond this many thousandths of an em reads as a word space.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, operand) in m.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        Some(Matrix(m))
    }

    /// `self × other`: apply `self`, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn origin(&self) -> (f64, f64) {
        (self.0[4], self.0[5])
    }

    fn vertical_scale(&self) -> f64 {
        (self.0[2] * self.0[2] + self.0[3] * self.0[3]).sqrt()
    }
}

/// Where an XObject was painted, by resource name.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    pub top: f64,
    pub x0: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub words: Vec<Word>,
    pub placements: Vec<Placement>,
}

struct PendingWord {
    text: String,
    x0: f64,
    x1: f64,
    top: f64,
    bottom: f64,
}

struct Interpreter<'d> {
    page_height: f64,
    decode: &'d dyn Fn(&[u8], &[u8]) -> String,
    ctm: Matrix,
    saved: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font: Vec<u8>,
    font_size: f64,
    leading: f64,
    pending: Option<PendingWord>,
    layout: PageLayout,
}

impl<'d> Interpreter<'d> {
    fn new(page_height: f64, decode: &'d dyn Fn(&[u8], &[u8]) -> String) -> Self {
        Self {
            page_height,
            decode,
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font: Vec::new(),
            font_size: DEFAULT_FONT_SIZE,
            leading: 0.0,
            pending: None,
            layout: PageLayout::default(),
        }
    }

    fn run(mut self, operations: &[Operation]) -> PageLayout {
        for op in operations {
            self.step(op);
        }
        self.finish_word();
        self.layout
    }

    fn step(&mut self, op: &Operation) {
        let operands = op.operands.as_slice();
        let num = |idx: usize| operands.get(idx).and_then(number);
        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => self.finish_word(),
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.font = name.clone();
                }
                self.font_size = num(1).unwrap_or(DEFAULT_FONT_SIZE);
            }
            "TL" => self.leading = num(0).unwrap_or(0.0),
            "Td" => self.move_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                self.leading = -ty;
                self.move_line(num(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.move_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    if -adjust > TJ_SPACE_THRESHOLD {
                                        self.finish_word();
                                    }
                                    self.advance(-adjust / 1000.0 * self.font_size);
                                }
                            }
                        }
                    }
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    // The XObject fills the unit square mapped through the CTM.
                    let (x, y) = self.ctm.origin();
                    let height = self.ctm.0[3].abs();
                    self.layout.placements.push(Placement {
                        name: String::from_utf8_lossy(name).into_owned(),
                        top: self.page_height - (y + height),
                        x0: x,
                    });
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn advance(&mut self, tx: f64) {
        self.tm = Matrix::translation(tx, 0.0).then(&self.tm);
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = (self.decode)(&self.font, bytes);
        for ch in text.chars() {
            let trm = self.tm.then(&self.ctm);
            let (x, y) = trm.origin();
            let size = match self.font_size * trm.vertical_scale() {
                s if s > 0.0 => s,
                _ => self.font_size.abs().max(1.0),
            };
            let width = GLYPH_ADVANCE * size;
            let (top, bottom) = (self.page_height - y - size, self.page_height - y);

            if ch.is_whitespace() || ch.is_control() {
                self.finish_word();
            } else {
                let continues = self.pending.as_ref().is_some_and(|w| {
                    (w.bottom - bottom).abs() <= 1.0 && x >= w.x1 - 1.0 && x - w.x1 <= width * 0.4
                });
                if !continues {
                    self.finish_word();
                }
                match self.pending.as_mut() {
                    Some(word) => {
                        word.text.push(ch);
                        word.x1 = x + width;
                    }
                    None => {
                        self.pending = Some(PendingWord {
                            text: ch.to_string(),
                            x0: x,
                            x1: x + width,
                            top,
                            bottom,
                        })
                    }
                }
            }
            self.advance(GLYPH_ADVANCE * self.font_size);
        }
    }

    fn finish_word(&mut self) {
        if let Some(w) = self.pending.take() {
            self.layout.words.push(Word::new(w.text, w.x0, w.x1, w.top, w.bottom));
        }
    }
}

/// Interpret already-decoded operations. `decode` maps `(font resource name, bytes)` to text.
pub fn interpret(operations: &[Operation], page_height: f64, decode: &dyn Fn(&[u8], &[u8]) -> String) -> PageLayout {
    Interpreter::new(page_height, decode).run(operations)
}

/// Interpret one page of a lopdf document.
pub fn interpret_page(doc: &LopdfDocument, page_id: ObjectId, page_height: f64) -> Result<PageLayout> {
    let bytes = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::ContentStreamFailed(e.to_string()))?;
    let content = Content::decode(&bytes).map_err(|e| PdfError::ContentStreamFailed(e.to_string()))?;

    let fonts: BTreeMap<Vec<u8>, &Dictionary> = doc.get_page_fonts(page_id).unwrap_or_default();
    let decode = |font: &[u8], raw: &[u8]| -> String {
        fonts
            .get(font)
            .and_then(|dict| dict.get_font_encoding(doc).ok())
            .and_then(|encoding| LopdfDocument::decode_text(&encoding, raw).ok())
            .unwrap_or_else(|| decode_pdf_string(raw))
    };

    Ok(interpret(&content.operations, page_height, &decode))
}
