//! Word geometry: lines and paragraphs from positioned words.
//!
//! Coordinates are in points with a top-left origin, the way the spatial
//! reconstructor orders blocks. Both PDF backends produce [`Word`]s and share
//! everything from here on.

use std::cmp::Ordering;

/// Words whose tops differ by less than this share a line.
const LINE_TOLERANCE: f64 = 3.0;

/// A vertical gap larger than this fraction of the line height starts a new paragraph.
const PARAGRAPH_GAP_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, top: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }
}

/// Words sharing a baseline, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub words: Vec<Word>,
    pub top: f64,
    pub bottom: f64,
}

impl Line {
    fn start(word: Word) -> Self {
        Self {
            top: word.top,
            bottom: word.bottom,
            words: vec![word],
        }
    }

    pub fn x0(&self) -> f64 {
        self.words.iter().map(|w| w.x0).fold(f64::INFINITY, f64::min)
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
    }
}

/// Positioned text block ready to become a content block.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub top: f64,
    pub x0: f64,
}

fn by_position(a: &Word, b: &Word) -> Ordering {
    a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0))
}

/// Group words into lines, top to bottom.
pub fn group_lines(mut words: Vec<Word>) -> Vec<Line> {
    words.retain(|w| !w.text.trim().is_empty());
    words.sort_by(by_position);

    let mut lines: Vec<Line> = Vec::new();
    for word in words {
        match lines.last_mut() {
            Some(line) if (word.top - line.top).abs() <= LINE_TOLERANCE => {
                line.bottom = line.bottom.max(word.bottom);
                line.words.push(word);
            }
            _ => lines.push(Line::start(word)),
        }
    }

    for line in &mut lines {
        line.words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    lines
}

/// Merge consecutive lines into paragraphs, splitting on large vertical gaps.
pub fn paragraphs(lines: &[Line]) -> Vec<Paragraph> {
    let mut out = Vec::new();
    let mut current: Vec<&Line> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            let gap = line.top - prev.bottom;
            let height = prev.height().max(line.height()).max(1.0);
            if gap > height * PARAGRAPH_GAP_RATIO {
                out.push(flush(&current));
                current.clear();
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        out.push(flush(&current));
    }
    out
}

fn flush(lines: &[&Line]) -> Paragraph {
    Paragraph {
        text: lines.iter().map(|l| l.text()).collect::<Vec<_>>().join("\n"),
        top: lines.first().map_or(0.0, |l| l.top),
        x0: lines.iter().map(|l| l.x0()).fold(f64::INFINITY, f64::min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word::new(text, x0, x0 + 6.0 * text.len() as f64, top, top + 12.0)
    }

    #[test]
    fn test_group_lines_orders_words() {
        let lines = group_lines(vec![
            word("world", 60.0, 101.0),
            word("Hello", 20.0, 100.0),
            word("below", 20.0, 130.0),
            word(" ", 90.0, 100.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[1].text(), "below");
    }

    #[test]
    fn test_paragraphs_split_on_gaps() {
        let lines = group_lines(vec![
            word("first", 20.0, 100.0),
            word("second", 20.0, 114.0),
            word("apart", 40.0, 160.0),
        ]);
        let paras = paragraphs(&lines);
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0].text, "first\nsecond");
        assert_eq!(paras[0].top, 100.0);
        assert_eq!(paras[1].text, "apart");
        assert_eq!(paras[1].x0, 40.0);
    }

    #[test]
    fn test_no_words_no_paragraphs() {
        assert!(paragraphs(&group_lines(Vec::new())).is_empty());
    }
}
