//! Markdown-likeness classification.
//!
//! Decides whether captured output should carry a rich-markdown render
//! hint. Pure pattern matching, no state.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::notebook::RenderHint;

static MARKDOWN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^#{1,6}\s+\S",      // headings
        r"(?m)^```",              // fenced blocks
        r"(?m)^\s*[-*+]\s+\S",    // unordered list items
        r"(?m)^\s*\d+\.\s+\S",    // ordered list items
        r"\[[^\]]+\]\([^)]+\)",   // links
        r"\*\*[^*\n]+\*\*",       // bold spans
        r"(?m)^\|.*\|",           // pipe tables
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static pattern"))
    .collect()
});

/// Check whether text contains markdown-like structure.
pub fn looks_like_markdown(text: &str) -> bool {
    MARKDOWN_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Choose a render hint for captured output text.
pub fn render_hint(text: &str) -> RenderHint {
    if looks_like_markdown(text) {
        RenderHint::Markdown
    } else {
        RenderHint::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_output() {
        assert!(!looks_like_markdown("total 12\ndrwxr-xr-x 2 root root\n"));
        assert_eq!(render_hint("hello world"), RenderHint::Plain);
    }

    #[test]
    fn test_headings_and_lists() {
        assert!(looks_like_markdown("# Summary\n\nAll good.\n"));
        assert!(looks_like_markdown("- item one\n- item two\n"));
        assert!(looks_like_markdown("1. first\n2. second\n"));
    }

    #[test]
    fn test_inline_structures() {
        assert!(looks_like_markdown("see [docs](https://example.com)"));
        assert!(looks_like_markdown("this is **important**"));
        assert!(looks_like_markdown("| a | b |\n| 1 | 2 |"));
        assert!(looks_like_markdown("```\ncode\n```"));
    }

    #[test]
    fn test_dashes_in_plain_text_do_not_match() {
        assert!(!looks_like_markdown("x - y - z"));
        assert!(!looks_like_markdown("2 * 3 = 6"));
    }
}
