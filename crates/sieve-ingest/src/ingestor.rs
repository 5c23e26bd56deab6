//! Ledger-backed ingestion pipeline.

use crate::chunker::{ChunkConfig, Chunker};
use crate::error::{IngestError, IngestResult};
use crate::hasher::hash_file;
use crate::parsers::{self, detect_kind};
use crate::refine::ChunkRefiner;
use sieve_config::Config;
use sieve_core::{Fingerprint, LogSink, ObservabilitySink, RefineCounters, TextUnit};
use sieve_db::{Database, DbResult};
use sieve_llm::ProviderRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_WRITE_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// What happened to one file.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Content was already recorded as successfully ingested.
    Skipped { fingerprint: Fingerprint, path: String },
    /// Content was processed and recorded as a success.
    Ingested {
        fingerprint: Fingerprint,
        path: String,
        units: Vec<TextUnit>,
        counters: RefineCounters,
    },
}

impl IngestOutcome {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            IngestOutcome::Skipped { fingerprint, .. } => fingerprint,
            IngestOutcome::Ingested { fingerprint, .. } => fingerprint,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, IngestOutcome::Skipped { .. })
    }
}

/// Totals for a directory run.
#[derive(Debug, Clone, Default)]
pub struct DirectoryReport {
    pub ingested: usize,
    pub skipped: usize,
    /// Files that failed, with the error text.
    pub failed: Vec<(PathBuf, String)>,
    pub units: usize,
    pub counters: RefineCounters,
}

/// Main ingestor for processing files.
pub struct Ingestor {
    db: Database,
    chunker: Chunker,
    refiner: ChunkRefiner,
    sink: Arc<dyn ObservabilitySink>,
    write_retries: u32,
    retry_backoff: Duration,
}

impl Ingestor {
    /// Create a new ingestor.
    pub fn new(db: Database, chunker: Chunker, refiner: ChunkRefiner) -> Self {
        Self {
            db,
            chunker,
            refiner,
            sink: Arc::new(LogSink),
            write_retries: DEFAULT_WRITE_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Create an ingestor with default chunking and rule-only refinement.
    pub fn with_defaults(db: Database) -> Self {
        Self::new(db, Chunker::default_chunker(), ChunkRefiner::new())
    }

    /// Build chunker, refiner and retry policy from configuration.
    pub fn from_config(db: Database, config: &Config, registry: &ProviderRegistry) -> IngestResult<Self> {
        let chunker = Chunker::new(ChunkConfig::from_config(&config.chunking));
        let refiner = ChunkRefiner::from_config(config, registry)?;
        Ok(Self::new(db, chunker, refiner).with_write_retries(config.ledger.write_retries))
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Extra attempts for a failed success write.
    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn refiner(&self) -> &ChunkRefiner {
        &self.refiner
    }

    /// Ingest a single file.
    ///
    /// Unreadable input is returned as an error without touching the ledger.
    /// Any later failure is recorded with `mark_failed` before it is returned.
    pub async fn ingest_file(&self, path: &Path, collection: Option<&str>) -> IngestResult<IngestOutcome> {
        let fingerprint = hash_file(path)?;
        let path_str = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        if self.db.should_skip(&fingerprint)? {
            debug!("Skipping unchanged content {} ({})", fingerprint.short(), path_str);
            return Ok(IngestOutcome::Skipped {
                fingerprint,
                path: path_str,
            });
        }

        info!("Ingesting file: {}", path_str);

        let (units, counters) = match self.process(path, &fingerprint).await {
            Ok(result) => result,
            Err(e) => {
                self.record_failure(&fingerprint, &path_str, &e);
                return Err(e);
            }
        };

        if let Err(e) = self.record_success(&fingerprint, &path_str, collection).await {
            let e = IngestError::Database(e);
            self.record_failure(&fingerprint, &path_str, &e);
            return Err(e);
        }

        info!(
            "Successfully ingested: {} ({} units, {} enhanced, {} fallback)",
            path_str,
            units.len(),
            counters.enhanced_count,
            counters.fallback_count
        );

        Ok(IngestOutcome::Ingested {
            fingerprint,
            path: path_str,
            units,
            counters,
        })
    }

    /// Ingest all supported files under `dir`. Per-file failures are
    /// collected in the report rather than aborting the walk.
    pub async fn ingest_directory(&self, dir: &Path, collection: Option<&str>) -> IngestResult<DirectoryReport> {
        if !dir.is_dir() {
            return Err(IngestError::ProcessingError(format!(
                "not a directory: {}",
                dir.display()
            )));
        }

        let mut report = DirectoryReport::default();

        for path in supported_files(dir) {
            match self.ingest_file(&path, collection).await {
                Ok(IngestOutcome::Skipped { .. }) => report.skipped += 1,
                Ok(IngestOutcome::Ingested { units, counters, .. }) => {
                    report.ingested += 1;
                    report.units += units.len();
                    report.counters.merge(counters);
                }
                Err(e) => {
                    warn!("Failed to ingest {:?}: {}", path, e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Load, split and refine. Nothing here writes to the ledger.
    async fn process(&self, path: &Path, fingerprint: &Fingerprint) -> IngestResult<(Vec<TextUnit>, RefineCounters)> {
        let kind = detect_kind(path)?;
        let mut document = parsers::parser_for(kind).parse(path)?;
        document.id = fingerprint.to_string();
        document.validate().map_err(IngestError::InvalidUnit)?;

        let units = self.chunker.split(&document);
        if units.is_empty() {
            return Err(IngestError::ProcessingError(
                "document has no text content".to_string(),
            ));
        }
        debug!("Split {} into {} units", path.display(), units.len());

        self.refiner.transform(units, self.sink.as_ref()).await
    }

    /// Write the success entry, retrying store failures without redoing
    /// any refinement.
    async fn record_success(&self, fingerprint: &Fingerprint, path: &str, collection: Option<&str>) -> DbResult<()> {
        let mut attempt = 0;
        loop {
            match self.db.mark_success(fingerprint, path, collection) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_persistence_failure() && attempt < self.write_retries => {
                    attempt += 1;
                    warn!(
                        "Ledger write for {} failed (attempt {}/{}): {}",
                        fingerprint.short(),
                        attempt,
                        self.write_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record_failure(&self, fingerprint: &Fingerprint, path: &str, error: &IngestError) {
        if let Err(e) = self.db.mark_failed(fingerprint, path, &error.to_string()) {
            warn!("Could not record failure for {}: {}", fingerprint.short(), e);
        }
    }
}

/// Supported files under `dir` in file-name order, skipping hidden entries.
pub fn supported_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let supported = detect_kind(p).is_ok();
            if !supported {
                debug!("Skipping unsupported file: {:?}", p);
            }
            supported
        })
        .collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;
    use crate::refine::REFINER_STAGE;
    use async_trait::async_trait;
    use rusqlite::functions::FunctionFlags;
    use sieve_core::{LedgerStatus, TraceContext};
    use sieve_db::DbError;
    use sieve_llm::{LlmError, LlmProvider, LlmResponse, LlmResult};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str) -> LlmResult<LlmResponse> {
            Err(LlmError::ServerNotRunning {
                host: "http://127.0.0.1:9".to_string(),
            })
        }
    }

    /// Echoes the prompt and counts calls.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, prompt: &str) -> LlmResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse::new(prompt, "counting-1"))
        }
    }

    /// Make the first `failures` success writes on the (single) in-memory
    /// connection fail. Returns the number of attempted success writes.
    fn fail_success_writes(db: &Database, failures: usize) -> Arc<AtomicUsize> {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let conn = db.conn().unwrap();
        conn.create_scalar_function("ledger_write_attempt", 0, FunctionFlags::SQLITE_UTF8, move |_| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= failures {
                Err(rusqlite::Error::UserFunctionError("disk I/O error".into()))
            } else {
                Ok(attempt as i64)
            }
        })
        .unwrap();
        conn.execute_batch(
            "CREATE TEMP TRIGGER fail_success_write
             BEFORE INSERT ON ingestion_history
             WHEN NEW.status = 'success'
             BEGIN SELECT ledger_write_attempt(); END;",
        )
        .unwrap();

        attempts
    }

    fn counting_ingestor(db: Database, provider: Arc<CountingProvider>) -> Ingestor {
        let refiner = ChunkRefiner::new().with_provider(provider).with_use_llm(true);
        Ingestor::new(db, Chunker::default_chunker(), refiner)
            .with_write_retries(2)
            .with_retry_backoff(Duration::from_millis(1))
    }

    fn setup() -> (TempDir, Ingestor) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let ingestor = Ingestor::with_defaults(db)
            .with_write_retries(1)
            .with_retry_backoff(Duration::from_millis(1));
        (dir, ingestor)
    }

    #[tokio::test]
    async fn test_unchanged_file_is_skipped() {
        let (dir, ingestor) = setup();
        let path = dir.path().join("report.md");
        fs::write(&path, "# Quarterly Report\n\nRevenue grew.\n").unwrap();

        let first = ingestor.ingest_file(&path, Some("finance")).await.unwrap();
        let f1 = first.fingerprint().clone();
        assert!(!first.is_skipped());
        assert!(ingestor.database().should_skip(&f1).unwrap());

        let entry = ingestor.database().get_ledger_entry(&f1).unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Success);
        assert_eq!(entry.collection.as_deref(), Some("finance"));

        let second = ingestor.ingest_file(&path, Some("finance")).await.unwrap();
        assert!(second.is_skipped());
        assert_eq!(second.fingerprint(), &f1);
    }

    #[tokio::test]
    async fn test_edited_file_is_reprocessed() {
        let (dir, ingestor) = setup();
        let path = dir.path().join("report.md");
        fs::write(&path, "# Quarterly Report\n\nRevenue grew.\n").unwrap();
        let f1 = ingestor.ingest_file(&path, None).await.unwrap().fingerprint().clone();

        fs::write(&path, "# Quarterly Report\n\nRevenue grew!\n").unwrap();
        let second = ingestor.ingest_file(&path, None).await.unwrap();

        assert!(!second.is_skipped());
        assert_ne!(second.fingerprint(), &f1);
        assert_eq!(ingestor.database().ledger_counts().unwrap().success, 2);
    }

    #[tokio::test]
    async fn test_units_are_refined_and_traceable() {
        let dir = TempDir::new().unwrap();
        let trace = Arc::new(TraceContext::new());
        let ingestor = Ingestor::with_defaults(Database::open_in_memory().unwrap())
            .with_sink(trace.clone());

        let path = dir.path().join("manual.txt");
        let content = "Page 1 | Manual\n\nChapter 5: Setup\n\nInstall   the   agent.\n\nCopyright 2024 Example";
        fs::write(&path, content).unwrap();

        let outcome = ingestor.ingest_file(&path, None).await.unwrap();
        let IngestOutcome::Ingested { fingerprint, units, counters, .. } = outcome else {
            panic!("expected an ingested outcome");
        };

        assert_eq!(fingerprint, hash_bytes(content.as_bytes()));
        assert_eq!(units.len(), 1);
        assert!(units[0].text.contains("Chapter 5: Setup"));
        assert!(units[0].text.contains("Install the agent."));
        assert!(!units[0].text.contains("Copyright"));
        assert_eq!(units[0].refined_by(), Some("rule"));
        assert_eq!(units[0].source_ref.as_deref(), Some(fingerprint.as_str()));
        assert!(units[0].source_path().unwrap().ends_with("manual.txt"));

        assert_eq!(counters.fallback_count, 1);
        assert_eq!(trace.stage(REFINER_STAGE).unwrap().counters, counters);
    }

    #[tokio::test]
    async fn test_enhancement_failure_still_succeeds() {
        let dir = TempDir::new().unwrap();
        let refiner = ChunkRefiner::new()
            .with_provider(Arc::new(FailingProvider))
            .with_use_llm(true);
        let ingestor = Ingestor::new(
            Database::open_in_memory().unwrap(),
            Chunker::default_chunker(),
            refiner,
        );

        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\n\nSome content.").unwrap();

        let outcome = ingestor.ingest_file(&path, None).await.unwrap();
        let IngestOutcome::Ingested { units, counters, .. } = outcome else {
            panic!("expected an ingested outcome");
        };
        assert_eq!(counters.enhanced_count, 0);
        assert_eq!(counters.fallback_count, 1);
        assert_eq!(units[0].refined_by(), Some("rule"));
    }

    #[tokio::test]
    async fn test_parse_failure_marks_failed() {
        let (dir, ingestor) = setup();
        let path = dir.path().join("broken.txt");
        fs::write(&path, [0x66u8, 0xff, 0xfe, 0x00]).unwrap();

        let result = ingestor.ingest_file(&path, Some("misc")).await;
        assert!(matches!(result, Err(IngestError::ParseError { .. })));

        let fingerprint = hash_file(&path).unwrap();
        let entry = ingestor.database().get_ledger_entry(&fingerprint).unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Failed);
        assert!(entry.error_message.unwrap().contains("not valid UTF-8"));
        assert!(!ingestor.database().should_skip(&fingerprint).unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_type_marks_failed() {
        let (dir, ingestor) = setup();
        let path = dir.path().join("scan.tiff");
        fs::write(&path, b"II*\0").unwrap();

        let result = ingestor.ingest_file(&path, None).await;
        assert!(matches!(result, Err(IngestError::UnsupportedFileType(_))));
        assert_eq!(ingestor.database().ledger_counts().unwrap().failed, 1);
    }

    #[tokio::test]
    async fn test_missing_file_leaves_ledger_untouched() {
        let (dir, ingestor) = setup();
        let result = ingestor.ingest_file(&dir.path().join("absent.md"), None).await;

        assert!(matches!(result, Err(IngestError::Hash(_))));
        assert_eq!(ingestor.database().ledger_counts().unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_ledger_write_retried_without_refining_again() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let attempts = fail_success_writes(&db, 1);
        let provider = Arc::new(CountingProvider::default());
        let ingestor = counting_ingestor(db, Arc::clone(&provider));

        let path = dir.path().join("report.md");
        fs::write(&path, "# Report\n\nRevenue grew in every region.").unwrap();

        let outcome = ingestor.ingest_file(&path, Some("finance")).await.unwrap();
        let IngestOutcome::Ingested { fingerprint, units, counters, .. } = outcome else {
            panic!("expected an ingested outcome");
        };

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), units.len());
        assert_eq!(counters.enhanced_count, units.len());

        let entry = ingestor.database().get_ledger_entry(&fingerprint).unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Success);
        assert_eq!(entry.collection.as_deref(), Some("finance"));
    }

    #[tokio::test]
    async fn test_ledger_write_failure_surfaces_after_retries() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let attempts = fail_success_writes(&db, usize::MAX);
        let provider = Arc::new(CountingProvider::default());
        let ingestor = counting_ingestor(db, Arc::clone(&provider));

        let path = dir.path().join("report.md");
        fs::write(&path, "# Report\n\nRevenue grew in every region.").unwrap();

        let result = ingestor.ingest_file(&path, None).await;
        assert!(
            matches!(result, Err(IngestError::Database(DbError::Persistence { .. }))),
            "{:?}",
            result.map(|o| o.is_skipped())
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let fingerprint = hash_file(&path).unwrap();
        let entry = ingestor.database().get_ledger_entry(&fingerprint).unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Failed);
        assert!(!ingestor.database().should_skip(&fingerprint).unwrap());
    }

    #[tokio::test]
    async fn test_failed_entry_is_retried() {
        let (dir, ingestor) = setup();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\n\nSome content.").unwrap();
        let fingerprint = hash_file(&path).unwrap();
        ingestor
            .database()
            .mark_failed(&fingerprint, "notes.md", "earlier crash")
            .unwrap();

        let outcome = ingestor.ingest_file(&path, None).await.unwrap();
        assert!(!outcome.is_skipped());

        let entry = ingestor.database().get_ledger_entry(&fingerprint).unwrap().unwrap();
        assert_eq!(entry.status, LedgerStatus::Success);
        assert!(entry.error_message.is_none());
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let (dir, ingestor) = setup();
        fs::write(dir.path().join("a.md"), "# A\n\nFirst note.").unwrap();
        fs::write(dir.path().join("b.txt"), "Second note.").unwrap();
        fs::write(dir.path().join("c.bin"), [0u8, 1, 2]).unwrap();
        fs::write(dir.path().join(".hidden.md"), "# Hidden").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("d.md"), "# D\n\nNested note.").unwrap();
        fs::write(dir.path().join("sub").join("e.txt"), "   \n").unwrap();

        let report = ingestor.ingest_directory(dir.path(), Some("notes")).await.unwrap();
        assert_eq!(report.ingested, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("e.txt"));

        let again = ingestor.ingest_directory(dir.path(), Some("notes")).await.unwrap();
        assert_eq!(again.ingested, 0);
        assert_eq!(again.skipped, 3);
        assert_eq!(again.failed.len(), 1);
    }
}
