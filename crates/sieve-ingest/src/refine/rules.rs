//! Deterministic, rule-based chunk cleaning.

use regex::Regex;
use std::sync::LazyLock;

static HTML_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// Lowercase HTML element names only; `Vec<String>` and `Map<K, V>` are not tags.
static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"</?(?:a|abbr|article|aside|b|blockquote|body|br|caption|center|cite|code|col|colgroup|",
        r"dd|del|div|dl|dt|em|figcaption|figure|font|footer|h[1-6]|head|header|hr|html|i|img|",
        r"ins|kbd|li|main|mark|nav|ol|p|pre|q|s|section|small|span|strong|sub|sup|table|",
        r"tbody|td|tfoot|th|thead|tr|u|ul)\b(?:\s[^<>]*)?/?>"
    ))
    .expect("valid regex")
});

/// A line made only of box-drawing or punctuation runs, e.g. `────` or `= = =`.
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[─━═┄┅┈┉╌╍\-_=*~#·•]\s*){3,}$").expect("valid regex"));

static PAGE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^page\s+\d+\s*(?:\|.*|of\s+\d+.*)$").expect("valid regex")
});

/// Boilerplate-shaped lines only: `Footer: ...`, `© 2024 ...`,
/// `Copyright (c) 2024 ...`, `All rights reserved` or a bare `Confidential`.
/// Sentences that merely start with those words are content.
static FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:",
        r"footer\s*:.*",
        r"|(?:©|\(c\))\s*(?:\d{4}|all\s+rights\s+reserved).*",
        r"|copyright\s*(?:©|\(c\))?\s*\d{4}.*",
        r"|all\s+rights\s+reserved\W*",
        r"|(?:strictly\s+)?confidential\W*",
        r")$"
    ))
    .expect("valid regex")
});

static INLINE_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

static EXCESS_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Removes layout noise left behind by document extraction.
///
/// Pure and stateless: the same input always yields the same output, and one
/// instance can be shared across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCleaner;

impl RuleCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean `text`. Markdown headings and list markers survive untouched.
    pub fn clean(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n");
        let text = HTML_COMMENT_RE.replace_all(&text, "");
        let text = HTML_TAG_RE.replace_all(&text, "");

        let mut lines = Vec::new();
        for line in text.lines() {
            let line = INLINE_SPACE_RE.replace_all(line.trim(), " ");
            if Self::is_noise_line(&line) {
                continue;
            }
            lines.push(line.into_owned());
        }

        let joined = lines.join("\n");
        EXCESS_BLANK_RE
            .replace_all(&joined, "\n\n")
            .trim()
            .to_string()
    }

    /// Whitespace-only cleanup for source code. Indentation, angle brackets
    /// and comment banners are left alone.
    pub fn clean_code(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n");
        let joined = text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
        EXCESS_BLANK_RE
            .replace_all(&joined, "\n\n")
            .trim_matches('\n')
            .to_string()
    }

    fn is_noise_line(line: &str) -> bool {
        if line.is_empty() {
            return false;
        }
        SEPARATOR_RE.is_match(line) || PAGE_HEADER_RE.is_match(line) || FOOTER_RE.is_match(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOISY_CHUNK: &str = "
────────────────────────────
Page 42 | Technical Documentation
────────────────────────────


Chapter 5: System Architecture

The   microservices   architecture  consists  of  several  key  components.

<!-- Internal note: Update diagram -->

<div class=\"important\">
Each service communicates via REST API or message queues.
</div>




The main   components   are:
- Gateway   Service  
- Authentication  Service  
- Data   Processing   Service


────────────────────────────
Footer: © 2024 Company | Confidential
────────────────────────────
";

    #[test]
    fn test_noisy_chunk() {
        let cleaned = RuleCleaner::new().clean(NOISY_CHUNK);

        assert!(!cleaned.contains('─'));
        assert!(!cleaned.contains("<!--"));
        assert!(!cleaned.contains("Internal note"));
        assert!(!cleaned.contains("<div"));
        assert!(!cleaned.contains("</div>"));
        assert!(!cleaned.contains("Footer"));
        assert!(!cleaned.contains("Confidential"));
        assert!(!cleaned.contains("Page 42"));

        for keyword in [
            "Chapter 5",
            "System Architecture",
            "microservices",
            "REST API",
            "message queues",
            "Gateway Service",
            "Authentication Service",
        ] {
            assert!(cleaned.contains(keyword), "missing {:?} in {:?}", keyword, cleaned);
        }
        assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn test_deterministic() {
        let cleaner = RuleCleaner::new();
        let first = cleaner.clean(NOISY_CHUNK);
        for _ in 0..5 {
            assert_eq!(cleaner.clean(NOISY_CHUNK), first);
        }
    }

    #[test]
    fn test_markdown_structure_preserved() {
        let input = "# Overview\n\n## Details\n\n- first item\n* second item\n1. numbered";
        let cleaned = RuleCleaner::new().clean(input);
        assert_eq!(cleaned, input);
    }

    #[test]
    fn test_multiline_comment_removed() {
        let input = "Before\n<!--\nhidden\nlines\n-->\nAfter";
        assert_eq!(RuleCleaner::new().clean(input), "Before\n\nAfter");
    }

    #[test]
    fn test_page_of_header_removed() {
        let input = "Page 3 of 10\nIntroduction text.";
        assert_eq!(RuleCleaner::new().clean(input), "Introduction text.");
    }

    #[test]
    fn test_copyright_line_removed() {
        let input = "Body text.\nCopyright 2023 Example Corp\n© All rights reserved";
        assert_eq!(RuleCleaner::new().clean(input), "Body text.");
    }

    #[test]
    fn test_sentences_starting_with_footer_words_kept() {
        let input = "# Licensing\n\n\
                     Copyright law grants authors exclusive rights.\n\
                     Confidential data must be encrypted at rest.\n\
                     (c) Each party shall indemnify the other.";
        assert_eq!(RuleCleaner::new().clean(input), input);
    }

    #[test]
    fn test_boilerplate_footers_removed() {
        let input = "Body text.\n\
                     © 2024 Example Corp\n\
                     Copyright (c) 2019-2024 Example Corp\n\
                     CONFIDENTIAL.\n\
                     Strictly Confidential\n\
                     All rights reserved.";
        assert_eq!(RuleCleaner::new().clean(input), "Body text.");
    }

    #[test]
    fn test_generics_in_prose_kept() {
        let input = "Return a Vec<String> or a HashMap<K, V> from <b>names</b>.";
        assert_eq!(
            RuleCleaner::new().clean(input),
            "Return a Vec<String> or a HashMap<K, V> from names."
        );
    }

    #[test]
    fn test_code_keeps_indentation_and_generics() {
        let input = "fn names() -> Vec<String> {\r\n    Vec::new()   \r\n}\r\n\r\n\r\n\r\n\
                     def f(x):\n    if x:\n        return <div>\n";
        assert_eq!(
            RuleCleaner::new().clean_code(input),
            "fn names() -> Vec<String> {\n    Vec::new()\n}\n\n\
             def f(x):\n    if x:\n        return <div>"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        let input = "A page about copyright law, covering 3 - 4 cases.";
        assert_eq!(RuleCleaner::new().clean(input), input);
    }
}
