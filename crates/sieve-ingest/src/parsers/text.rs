//! Plain text document parser.

use super::{read_text, DocumentParser};
use crate::error::IngestResult;
use sieve_core::{new_id, Document, DocumentKind, FORMAT_KEY};
use std::path::Path;

/// Parser for plain text files (including code).
pub struct TextParser;

impl TextParser {
    /// Create a new text parser.
    pub fn new() -> Self {
        Self
    }

    /// Detect programming language from extension.
    fn detect_language(extension: &str) -> Option<&'static str> {
        match extension.to_lowercase().as_str() {
            "rs" => Some("rust"),
            "py" => Some("python"),
            "js" => Some("javascript"),
            "ts" => Some("typescript"),
            "go" => Some("go"),
            "c" => Some("c"),
            "cpp" | "h" => Some("cpp"),
            "java" => Some("java"),
            "rb" => Some("ruby"),
            "sh" => Some("shell"),
            "json" => Some("json"),
            "yaml" | "yml" => Some("yaml"),
            "toml" => Some("toml"),
            "html" => Some("html"),
            "css" => Some("css"),
            "sql" => Some("sql"),
            _ => None,
        }
    }
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for TextParser {
    fn parse(&self, path: &Path) -> IngestResult<Document> {
        let content = read_text(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let kind = match DocumentKind::from_extension(extension) {
            Some(DocumentKind::Code) => DocumentKind::Code,
            _ => DocumentKind::Text,
        };
        let lines = content.lines().count();
        let length = content.len();

        let mut doc = Document::new(new_id(), content, path.to_string_lossy())
            .with_metadata(FORMAT_KEY, kind.as_str())
            .with_metadata("length", length)
            .with_metadata("lines", lines);

        if let Some(lang) = Self::detect_language(extension) {
            doc = doc.with_metadata("language", lang);
        }

        // Use filename as title
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            doc = doc.with_metadata("title", name);
        }

        Ok(doc)
    }

    fn extensions(&self) -> &[&str] {
        &[
            "txt", "text", "log", "rst", "org", // Plain text
            "rs", "py", "js", "ts", "go", "c", "cpp", "h", "java", "rb", "sh", // Code
            "json", "yaml", "yml", "toml", "html", "css", "sql",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_text() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "This is a plain text file.\nWith multiple lines.").unwrap();

        let doc = TextParser::new().parse(file.path()).unwrap();

        assert!(doc.text.contains("plain text file"));
        assert_eq!(doc.metadata["format"], "text");
        assert_eq!(doc.metadata["lines"], 2);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_parse_code() {
        let mut file = NamedTempFile::with_suffix(".rs").unwrap();
        writeln!(
            file,
            r#"fn main() {{
    println!("Hello, world!");
}}"#
        )
        .unwrap();

        let doc = TextParser::new().parse(file.path()).unwrap();

        assert!(doc.text.contains("fn main()"));
        assert_eq!(doc.metadata["format"], "code");
        assert_eq!(doc.metadata["language"], "rust");
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(TextParser::detect_language("rs"), Some("rust"));
        assert_eq!(TextParser::detect_language("py"), Some("python"));
        assert_eq!(TextParser::detect_language("JS"), Some("javascript"));
        assert_eq!(TextParser::detect_language("xyz"), None);
    }
}
