//! Markdown document parser.

use super::{read_text, DocumentParser};
use crate::error::IngestResult;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use sieve_core::{new_id, Document, DocumentKind, FORMAT_KEY};
use std::path::Path;

/// Parser for Markdown files. Emits plain text with heading markers and list
/// bullets kept, so later stages still see the document structure.
pub struct MarkdownParser {
    /// Whether to preserve code block fences.
    preserve_code_blocks: bool,
}

struct Extracted {
    text: String,
    title: Option<String>,
    links: Vec<String>,
}

impl MarkdownParser {
    /// Create a new markdown parser.
    pub fn new() -> Self {
        Self {
            preserve_code_blocks: true,
        }
    }

    fn extract_text(&self, markdown: &str) -> Extracted {
        let parser = Parser::new(markdown);
        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut links = Vec::new();
        let mut heading: Option<(HeadingLevel, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::Heading(level, _, _)) => {
                    heading = Some((level, String::new()));
                }
                Event::End(Tag::Heading(_, _, _)) => {
                    if let Some((level, content)) = heading.take() {
                        let content = content.trim();
                        if level == HeadingLevel::H1 && title.is_none() {
                            title = Some(content.to_string());
                        }
                        text.push_str(&"#".repeat(heading_depth(level)));
                        text.push(' ');
                        text.push_str(content);
                        text.push_str("\n\n");
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => {
                    if self.preserve_code_blocks {
                        text.push_str("```\n");
                    }
                }
                Event::End(Tag::CodeBlock(_)) => {
                    if self.preserve_code_blocks {
                        text.push_str("```\n\n");
                    }
                }
                Event::Start(Tag::Link(_, dest, _)) => {
                    links.push(dest.to_string());
                }
                Event::End(Tag::Paragraph) => {
                    text.push_str("\n\n");
                }
                Event::End(Tag::List(_)) => {
                    text.push('\n');
                }
                Event::Start(Tag::Item) => {
                    text.push_str("- ");
                }
                Event::End(Tag::Item) => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Event::Text(t) => match heading.as_mut() {
                    Some((_, content)) => content.push_str(&t),
                    None => text.push_str(&t),
                },
                Event::Code(code) => {
                    let target = match heading.as_mut() {
                        Some((_, content)) => content,
                        None => &mut text,
                    };
                    target.push('`');
                    target.push_str(&code);
                    target.push('`');
                }
                Event::SoftBreak | Event::HardBreak => {
                    text.push('\n');
                }
                _ => {}
            }
        }

        Extracted {
            text: text.trim().to_string(),
            title,
            links,
        }
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for MarkdownParser {
    fn parse(&self, path: &Path) -> IngestResult<Document> {
        let content = read_text(path)?;
        let extracted = self.extract_text(&content);

        let title = extracted.title.or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        });

        let mut doc = Document::new(new_id(), extracted.text, path.to_string_lossy())
            .with_metadata(FORMAT_KEY, DocumentKind::Markdown.as_str())
            .with_metadata("links", extracted.links)
            .with_metadata("original_length", content.len());

        if let Some(t) = title {
            doc = doc.with_metadata("title", t);
        }

        Ok(doc)
    }

    fn extensions(&self) -> &[&str] {
        &["md", "markdown", "mdown", "mkd"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_markdown() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(
            file,
            r#"# My Document

This is a paragraph with some text.

## Section One

More content here with a [link](https://example.com).

```rust
fn main() {{
    println!("Hello");
}}
```

- Item one
- Item two
"#
        )
        .unwrap();

        let parser = MarkdownParser::new();
        let doc = parser.parse(file.path()).unwrap();

        assert_eq!(doc.metadata["title"], "My Document");
        assert_eq!(doc.metadata["format"], "markdown");
        let expected_path = file.path().to_string_lossy().to_string();
        assert_eq!(doc.source_path(), Some(expected_path.as_str()));
        assert!(doc.text.starts_with("# My Document"));
        assert!(doc.text.contains("## Section One"));
        assert!(doc.text.contains("This is a paragraph"));
        assert!(doc.text.contains("fn main()"));
        assert!(doc.text.contains("- Item one\n- Item two"));

        let links = doc.metadata["links"].as_array().unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0], "https://example.com");
    }

    #[test]
    fn test_no_title_uses_file_stem() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(file, "Just some text without a heading.").unwrap();

        let doc = MarkdownParser::new().parse(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_str().unwrap();
        assert_eq!(doc.metadata["title"], stem);
    }

    #[test]
    fn test_supports() {
        let parser = MarkdownParser::new();
        assert!(parser.supports("MD"));
        assert!(!parser.supports("txt"));
    }
}
