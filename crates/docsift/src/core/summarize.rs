//! Head-and-tail truncation of long output.

/// Keep the first and last `max_length / 2` characters around a marker.
///
/// Returns the content unchanged and `false` when it already fits.
pub fn summarize(content: &str, max_length: usize) -> (String, bool) {
    let total = content.chars().count();
    if total <= max_length {
        return (content.to_string(), false);
    }

    let half = max_length / 2;
    let head_end = content.char_indices().nth(half).map(|(i, _)| i).unwrap_or(content.len());
    let tail_start = content
        .char_indices()
        .nth(total - half)
        .map(|(i, _)| i)
        .unwrap_or(content.len());

    let summary = format!(
        "{}\n\n... [Content truncated, total length: {} characters] ...\n\n{}",
        &content[..head_end],
        total,
        &content[tail_start..]
    );
    (summary, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_untouched() {
        let (out, summarized) = summarize("hello", 500);
        assert_eq!(out, "hello");
        assert!(!summarized);
    }

    #[test]
    fn test_truncation_law() {
        let content: String = (0..2000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let (out, summarized) = summarize(&content, 500);
        assert!(summarized);
        assert!(out.starts_with(&content[..250]));
        assert!(out.ends_with(&content[content.len() - 250..]));
        let marker = "\n\n... [Content truncated, total length: 2000 characters] ...\n\n";
        assert!(out.contains(marker));
        assert_eq!(out.len(), 500 + marker.len());
    }

    #[test]
    fn test_multibyte_boundaries() {
        let content = "é".repeat(40);
        let (out, summarized) = summarize(&content, 10);
        assert!(summarized);
        assert!(out.starts_with("ééééé\n\n"));
        assert!(out.ends_with("...\n\nééééé"));
        assert!(out.contains("total length: 40 characters"));
    }

    #[test]
    fn test_odd_max_length_uses_floor_half() {
        let content = "0123456789abcdef";
        let (out, _) = summarize(content, 5);
        assert!(out.starts_with("01\n\n"));
        assert!(out.ends_with("\n\nef"));
    }
}
