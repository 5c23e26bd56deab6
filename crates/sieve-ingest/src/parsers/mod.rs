//! Document loaders for text-based file types.

mod markdown;
mod text;

pub use markdown::MarkdownParser;
pub use text::TextParser;

use crate::error::{IngestError, IngestResult};
use sieve_core::{Document, DocumentKind};
use std::io::ErrorKind;
use std::path::Path;

/// Trait for document parsers.
pub trait DocumentParser: Send + Sync {
    /// Load a file at the given path into a [`Document`].
    fn parse(&self, path: &Path) -> IngestResult<Document>;

    /// Get the supported file extensions.
    fn extensions(&self) -> &[&str];

    /// Check if this parser supports the given extension.
    fn supports(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Get the parser for a document kind.
pub fn parser_for(kind: DocumentKind) -> Box<dyn DocumentParser> {
    match kind {
        DocumentKind::Markdown => Box::new(MarkdownParser::new()),
        DocumentKind::Text | DocumentKind::Code => Box::new(TextParser::new()),
    }
}

/// Detect the document kind from a path's extension.
pub fn detect_kind(path: &Path) -> IngestResult<DocumentKind> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    DocumentKind::from_extension(extension).ok_or_else(|| {
        IngestError::UnsupportedFileType(if extension.is_empty() {
            "unknown".to_string()
        } else {
            extension.to_string()
        })
    })
}

/// Parse a file based on its extension.
pub fn parse_file(path: &Path) -> IngestResult<Document> {
    parser_for(detect_kind(path)?).parse(path)
}

/// Read a file as UTF-8, reporting undecodable content as a parse error.
pub(crate) fn read_text(path: &Path) -> IngestResult<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => IngestError::ParseError {
            path: path.to_path_buf(),
            message: "file is not valid UTF-8".to_string(),
        },
        _ => IngestError::Io(e),
    })
}
