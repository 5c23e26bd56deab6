//! Core domain types for Sieve.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for text units.
pub type UnitId = String;

/// Unique identifier for documents.
pub type DocumentId = String;

/// Free-form metadata attached to documents and text units.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key every document and text unit must carry.
pub const SOURCE_PATH_KEY: &str = "source_path";

/// Metadata key recording which refinement strategy produced the unit text.
pub const REFINED_BY_KEY: &str = "refined_by";

/// Metadata key holding the [`DocumentKind`] a document was loaded as.
pub const FORMAT_KEY: &str = "format";

/// Metadata key recording why the rule-based fallback was used.
pub const FALLBACK_REASON_KEY: &str = "refine_fallback_reason";

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// SHA-256 content fingerprint, stored as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the hex encoding.
    pub const HEX_LEN: usize = 64;

    /// Build a fingerprint from a finished SHA-256 digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse a fingerprint from its hex form. Uppercase input is normalized.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.len() != Self::HEX_LEN {
            return Err(Error::InvalidFingerprint {
                value: value.to_string(),
                reason: format!("expected {} hex characters, got {}", Self::HEX_LEN, trimmed.len()),
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidFingerprint {
                value: value.to_string(),
                reason: "contains non-hex characters".to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome recorded in the ledger for a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Success,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Success => "success",
            LedgerStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(LedgerStatus::Success),
            "failed" => Some(LedgerStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the integrity ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub fingerprint: Fingerprint,
    pub source_path: String,
    pub status: LedgerStatus,
    pub collection: Option<String>,
    /// Present iff `status` is `Failed`.
    pub error_message: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether a later ingestion run may skip this content.
    pub fn is_skippable(&self) -> bool {
        self.status == LedgerStatus::Success
    }
}

/// Kind of source document, used to pick a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Markdown,
    Text,
    Code,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Markdown => "markdown",
            DocumentKind::Text => "text",
            DocumentKind::Code => "code",
        }
    }

    /// Detect document kind from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" | "mdown" | "mkd" => Some(DocumentKind::Markdown),
            "txt" | "text" | "log" | "rst" | "org" => Some(DocumentKind::Text),
            "rs" | "py" | "js" | "ts" | "go" | "c" | "cpp" | "h" | "java" | "rb" | "sh"
            | "json" | "yaml" | "yml" | "toml" | "html" | "css" | "sql" => {
                Some(DocumentKind::Code)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raw document produced by a loader, before splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_path: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_PATH_KEY.to_string(), source_path.into().into());
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source_path(&self) -> Option<&str> {
        self.metadata.get(SOURCE_PATH_KEY).and_then(|v| v.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        match self.source_path() {
            Some(path) if !path.trim().is_empty() => Ok(()),
            _ => Err(Error::InvalidDocument {
                id: self.id.clone(),
                reason: format!("metadata must contain '{}'", SOURCE_PATH_KEY),
            }),
        }
    }
}

/// A chunk of document text plus traceability metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextUnit {
    pub id: UnitId,
    pub text: String,
    pub metadata: Metadata,
    pub start_offset: Option<usize>,
    pub end_offset: Option<usize>,
    /// ID of the parent document.
    pub source_ref: Option<DocumentId>,
}

impl TextUnit {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_path: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_PATH_KEY.to_string(), source_path.into().into());
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            start_offset: None,
            end_offset: None,
            source_ref: None,
        }
    }

    /// Build a unit from an arbitrary metadata map. Nothing is validated here.
    pub fn with_raw_metadata(id: impl Into<String>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            start_offset: None,
            end_offset: None,
            source_ref: None,
        }
    }

    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.start_offset = Some(start);
        self.end_offset = Some(end);
        self
    }

    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source_path(&self) -> Option<&str> {
        self.metadata.get(SOURCE_PATH_KEY).and_then(|v| v.as_str())
    }

    /// Check the caller contract: a traceable source and non-blank text.
    pub fn validate(&self) -> Result<()> {
        match self.source_path() {
            Some(path) if !path.trim().is_empty() => {}
            _ => {
                return Err(Error::InvalidUnit {
                    id: self.id.clone(),
                    reason: format!("metadata must contain '{}'", SOURCE_PATH_KEY),
                })
            }
        }

        if is_blank(&self.text) {
            return Err(Error::InvalidUnit {
                id: self.id.clone(),
                reason: "text is empty after normalization".to_string(),
            });
        }

        Ok(())
    }

    /// Replace the text with the refined result and stamp how it was produced.
    pub fn apply_outcome(&mut self, outcome: RefinementOutcome) {
        self.metadata.insert(
            REFINED_BY_KEY.to_string(),
            outcome.strategy_used.metadata_tag().into(),
        );
        match outcome.fallback_reason {
            Some(reason) => {
                self.metadata.insert(FALLBACK_REASON_KEY.to_string(), reason.into());
            }
            None => {
                self.metadata.remove(FALLBACK_REASON_KEY);
            }
        }
        self.text = outcome.refined_text;
    }

    /// True when the unit was cut from a source code file.
    pub fn is_code(&self) -> bool {
        self.metadata.get(FORMAT_KEY).and_then(|v| v.as_str()) == Some(DocumentKind::Code.as_str())
    }

    /// Strategy recorded by a previous `apply_outcome`, if any.
    pub fn refined_by(&self) -> Option<&str> {
        self.metadata.get(REFINED_BY_KEY).and_then(|v| v.as_str())
    }
}

/// True when nothing but whitespace, control or zero-width characters remain.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(|c| {
        c.is_whitespace() || c.is_control() || matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}')
    })
}

/// Which refinement path produced a unit's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefineStrategy {
    Enhanced,
    Fallback,
}

impl RefineStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefineStrategy::Enhanced => "enhanced",
            RefineStrategy::Fallback => "fallback",
        }
    }

    /// Value written under `refined_by` in unit metadata.
    pub fn metadata_tag(&self) -> &'static str {
        match self {
            RefineStrategy::Enhanced => "llm",
            RefineStrategy::Fallback => "rule",
        }
    }
}

impl std::fmt::Display for RefineStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of refining one text unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub refined_text: String,
    pub strategy_used: RefineStrategy,
    /// Present iff `strategy_used` is `Fallback`.
    pub fallback_reason: Option<String>,
}

impl RefinementOutcome {
    pub fn enhanced(text: impl Into<String>) -> Self {
        Self {
            refined_text: text.into(),
            strategy_used: RefineStrategy::Enhanced,
            fallback_reason: None,
        }
    }

    pub fn fallback(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            refined_text: text.into(),
            strategy_used: RefineStrategy::Fallback,
            fallback_reason: Some(reason.into()),
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.strategy_used == RefineStrategy::Enhanced
    }
}

/// Per-batch refinement counters reported to the observability sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineCounters {
    pub enhanced_count: usize,
    pub fallback_count: usize,
}

impl RefineCounters {
    pub fn record(&mut self, strategy: RefineStrategy) {
        match strategy {
            RefineStrategy::Enhanced => self.enhanced_count += 1,
            RefineStrategy::Fallback => self.fallback_count += 1,
        }
    }

    pub fn merge(&mut self, other: RefineCounters) {
        self.enhanced_count += other.enhanced_count;
        self.fallback_count += other.fallback_count;
    }

    pub fn total(&self) -> usize {
        self.enhanced_count + self.fallback_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_fingerprint_serde_validates() {
        let fp: Fingerprint = serde_json::from_str(&format!("\"{}\"", HASH.to_uppercase())).unwrap();
        assert_eq!(fp.as_str(), HASH);
        assert_eq!(serde_json::to_string(&fp).unwrap(), format!("\"{}\"", HASH));

        assert!(serde_json::from_str::<Fingerprint>("\"abc\"").is_err());
    }

    #[test]
    fn test_unit_is_code() {
        let unit = TextUnit::new("u1", "fn main() {}", "src/main.rs");
        assert!(!unit.is_code());
        assert!(unit.with_metadata(FORMAT_KEY, DocumentKind::Code.as_str()).is_code());
    }

    #[test]
    fn test_fingerprint_parse() {
        let fp = Fingerprint::parse(HASH).unwrap();
        assert_eq!(fp.as_str(), HASH);
        assert_eq!(fp.short(), "e3b0c44298fc");

        let upper = Fingerprint::parse(&HASH.to_uppercase()).unwrap();
        assert_eq!(upper, fp);

        assert!(Fingerprint::parse("abc123").is_err());
        assert!(Fingerprint::parse(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_ledger_status_from_str() {
        assert_eq!(LedgerStatus::from_str("success"), Some(LedgerStatus::Success));
        assert_eq!(LedgerStatus::from_str("FAILED"), Some(LedgerStatus::Failed));
        assert_eq!(LedgerStatus::from_str("pending"), None);
    }

    #[test]
    fn test_document_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("MD"), Some(DocumentKind::Markdown));
        assert_eq!(DocumentKind::from_extension("txt"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_extension("rs"), Some(DocumentKind::Code));
        assert_eq!(DocumentKind::from_extension("mp4"), None);
    }

    #[test]
    fn test_unit_validation() {
        let unit = TextUnit::new("u1", "Some text", "docs/a.md");
        assert!(unit.validate().is_ok());

        let blank = TextUnit::new("u2", " \n\t\u{200b} ", "docs/a.md");
        assert!(matches!(blank.validate(), Err(Error::InvalidUnit { .. })));

        let untraceable = TextUnit::with_raw_metadata("u3", "Some text", Metadata::new());
        let err = untraceable.validate().unwrap_err();
        assert!(err.to_string().contains(SOURCE_PATH_KEY));
    }

    #[test]
    fn test_apply_outcome_stamps_metadata() {
        let mut unit = TextUnit::new("u1", "raw   text", "docs/a.md");

        unit.apply_outcome(RefinementOutcome::fallback("raw text", "enhancement disabled"));
        assert_eq!(unit.text, "raw text");
        assert_eq!(unit.refined_by(), Some("rule"));
        assert_eq!(unit.metadata[FALLBACK_REASON_KEY], "enhancement disabled");

        unit.apply_outcome(RefinementOutcome::enhanced("Raw text."));
        assert_eq!(unit.refined_by(), Some("llm"));
        assert!(!unit.metadata.contains_key(FALLBACK_REASON_KEY));
        assert_eq!(unit.source_path(), Some("docs/a.md"));
    }

    #[test]
    fn test_refine_counters() {
        let mut counters = RefineCounters::default();
        counters.record(RefineStrategy::Enhanced);
        counters.record(RefineStrategy::Fallback);
        counters.record(RefineStrategy::Fallback);

        assert_eq!(counters.enhanced_count, 1);
        assert_eq!(counters.fallback_count, 2);
        assert_eq!(counters.total(), 3);
    }
}
