//! XHTML/HTML to plain text.
//!
//! Well-formed XHTML is walked with roxmltree, one line per text node. Markup
//! that is not valid XML (HTML entities, unclosed tags) goes through
//! `html-to-markdown-rs` and has the Markdown syntax stripped afterwards.

use crate::{DocsiftError, Result};
use html_to_markdown_rs::{ConversionOptions, PreprocessingOptions, convert as convert_html};
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("Title regex pattern is valid and should compile"));
static MARKDOWN_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("Markdown image regex pattern is valid and should compile"));
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("Markdown link regex pattern is valid and should compile")
});
static HTML_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("HTML comment regex pattern is valid and should compile"));

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head"];

/// Text of one (X)HTML document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlText {
    /// Content of `<title>`, trimmed.
    pub title: Option<String>,
    /// Body text, one non-empty trimmed phrase per line.
    pub text: String,
}

/// Extract the title and body text of an (X)HTML document.
///
/// # Errors
///
/// `Parsing` only when neither the XML walk nor the HTML conversion succeeds.
pub fn html_to_text(html: &str) -> Result<HtmlText> {
    match roxmltree::Document::parse_with_options(
        html,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    ) {
        Ok(doc) => Ok(walk_xhtml(&doc)),
        Err(e) => {
            tracing::debug!("Not well-formed XHTML ({}), converting as HTML", e);
            convert_loose_html(html)
        }
    }
}

fn walk_xhtml(doc: &roxmltree::Document) -> HtmlText {
    let title = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("title"))
        .map(|n| collect_text(n).trim().to_string())
        .filter(|t| !t.is_empty());

    let mut pieces = Vec::new();
    for node in doc.descendants().filter(|n| n.is_text()) {
        let hidden = node.ancestors().any(|a| {
            a.is_element()
                && SKIPPED_ELEMENTS
                    .iter()
                    .any(|s| a.tag_name().name().eq_ignore_ascii_case(s))
        });
        if !hidden && let Some(text) = node.text() {
            pieces.push(text);
        }
    }

    HtmlText {
        title,
        text: tidy_lines(&pieces.join("\n")),
    }
}

fn collect_text(node: roxmltree::Node) -> String {
    node.descendants().filter(|n| n.is_text()).filter_map(|n| n.text()).collect()
}

fn convert_loose_html(html: &str) -> Result<HtmlText> {
    let title = TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    let options = ConversionOptions {
        extract_metadata: false,
        preprocessing: PreprocessingOptions {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let markdown = convert_html(html, Some(options))
        .map_err(|e| DocsiftError::parsing(format!("Failed to convert HTML: {}", e)))?;

    let mut text = markdown_to_plain_text(&HTML_COMMENT.replace_all(&markdown, "\n"));
    // html-to-markdown emits the title as a leading line; it is reported separately.
    if let Some(t) = &title
        && let Some(rest) = text.strip_prefix(t.as_str())
    {
        text = rest.trim_start().to_string();
    }

    Ok(HtmlText {
        title,
        text: tidy_lines(&text),
    })
}

/// Drop Markdown markup, keeping the words.
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for line in markdown.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            lines.push(trimmed.to_string());
            continue;
        }

        let mut cleaned = trimmed;
        if let Some(rest) = cleaned.strip_prefix("- ").or_else(|| cleaned.strip_prefix("* ")) {
            cleaned = rest;
        } else if let Some((number, rest)) = cleaned.split_once(". ")
            && !number.is_empty()
            && number.chars().all(|c| c.is_ascii_digit())
        {
            cleaned = rest;
        }
        let cleaned = cleaned.trim_start_matches('#').trim_start_matches('>').trim();

        let cleaned = MARKDOWN_IMAGE.replace_all(cleaned, "");
        let cleaned = MARKDOWN_LINK.replace_all(&cleaned, "$1");
        let cleaned = cleaned.replace("**", "").replace("__", "");
        lines.push(cleaned);
    }

    lines.join("\n")
}

/// Trim every line, split phrases on double spaces, drop empties.
pub fn tidy_lines(text: &str) -> String {
    text.lines()
        .flat_map(|line| line.trim().split("  ").map(str::trim).collect::<Vec<_>>())
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xhtml_walk() {
        let xhtml = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter One</title><style>p { color: red; }</style></head>
<body>
  <h1>The Beginning</h1>
  <p>It was a <em>dark</em> night.</p>
  <script>var x = 1;</script>
</body>
</html>"#;
        let out = html_to_text(xhtml).unwrap();
        assert_eq!(out.title.as_deref(), Some("Chapter One"));
        assert_eq!(out.text, "The Beginning\nIt was a\ndark\nnight.");
    }

    #[test]
    fn test_loose_html_falls_back_to_conversion() {
        let html = "<html><head><title>T</title></head><body><p>Caf&eacute;&nbsp;open<br>now</p>\
                    <p><a href=\"x.html\">link text</a></p></body></html>";
        let out = html_to_text(html).unwrap();
        assert_eq!(out.title.as_deref(), Some("T"));
        assert!(out.text.contains("link text"));
        assert!(!out.text.contains("x.html"));
        assert!(!out.text.contains("<p>"));
    }

    #[test]
    fn test_markdown_to_plain_text() {
        let md = "# Title\n\n- **bold** item\n1. [link](http://x)\n![img](a.png)";
        assert_eq!(markdown_to_plain_text(md), "Title\n\nbold item\nlink\n");
    }

    #[test]
    fn test_tidy_lines() {
        assert_eq!(tidy_lines("  a  b \n\n   \nc"), "a\nb\nc");
    }
}
