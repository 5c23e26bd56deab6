//! Prompt template for LLM chunk refinement.

use crate::error::{IngestError, IngestResult};
use std::path::Path;

/// Placeholder replaced by the chunk text.
pub const TEXT_PLACEHOLDER: &str = "{text}";

const DEFAULT_TEMPLATE: &str = "You are cleaning text extracted from a document for a search index.

Remove layout artifacts: decorative separator lines, page headers and footers, \
copyright notices, HTML tags and comments, and redundant whitespace. Fix broken \
line wraps. Keep every piece of real content, including headings, lists and \
code, and do not summarize, translate or add commentary.

Return only the cleaned text.

Text:
{text}";

/// A prompt with a single `{text}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Build a template, rejecting ones without the placeholder.
    pub fn new(template: impl Into<String>) -> IngestResult<Self> {
        let template = template.into();
        if !template.contains(TEXT_PLACEHOLDER) {
            return Err(IngestError::Prompt(format!(
                "template must contain the {} placeholder",
                TEXT_PLACEHOLDER
            )));
        }
        Ok(Self { template })
    }

    /// Load a template file.
    pub fn load(path: &Path) -> IngestResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Prompt(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::new(content)
    }

    /// Use `path` when given, otherwise the built-in template.
    pub fn load_or_default(path: Option<&str>) -> IngestResult<Self> {
        match path {
            Some(p) if !p.trim().is_empty() => Self::load(Path::new(p)),
            _ => Ok(Self::default()),
        }
    }

    pub fn render(&self, text: &str) -> String {
        self.template.replace(TEXT_PLACEHOLDER, text)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
