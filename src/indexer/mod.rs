// Indexing engine: per-file state machine over the structured store

pub mod chunker;
pub mod delta;
pub mod ignore;
pub mod parser;
pub mod store;
pub mod summary;
pub mod worker;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::index::db::{FileDeletion, IndexDatabase, IndexStats};
use crate::index::{fingerprint, IndexRecord, IndexStatus, Relationship, Symbol};
use chunker::{detect_language, Chunker, LineChunker};
use parser::{Language, ParserRegistry};
use store::{ChunkStore, VectorStore};
use summary::{SimpleSummarizer, Summarizer};

/// Result of `Indexer::index_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum IndexOutcome {
    Indexed {
        chunks: usize,
        symbols: usize,
        relationships: usize,
    },
    /// Fingerprint matched a completed record; nothing was touched
    Unchanged,
    NotFound,
    Failed(String),
}

impl IndexOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IndexOutcome::Indexed { .. } | IndexOutcome::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub enable_ast: bool,
    pub ast_max_file_size: u64,
    pub languages: Vec<Language>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            enable_ast: true,
            ast_max_file_size: 500_000,
            languages: Language::ALL.to_vec(),
        }
    }
}

impl IndexerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enable_ast: config.indexing.enable_ast,
            ast_max_file_size: config.indexing.ast_max_file_size,
            languages: config.enabled_languages(),
        }
    }
}

/// Input for a batch summarization pass
#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub path: String,
    pub content: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub path: String,
    pub status: IndexStatus,
    pub chunks: usize,
    pub error: Option<String>,
    pub indexed_at: Option<String>,
}

impl From<IndexRecord> for FileStatus {
    fn from(record: IndexRecord) -> Self {
        Self {
            path: record.file_path,
            status: record.status,
            chunks: record.unit_count,
            error: record.error_message,
            indexed_at: record.indexed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// `get_status` result: counts only, or one row per file
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatusReport {
    Compact {
        total: usize,
        by_status: std::collections::BTreeMap<String, usize>,
    },
    Detailed {
        total: usize,
        files: Vec<FileStatus>,
    },
}

/// Pure read over the index records
pub fn status_report(db: &IndexDatabase, compact: bool) -> Result<StatusReport> {
    if compact {
        let by_status = db.count_by_status()?;
        let total = by_status.values().sum();
        Ok(StatusReport::Compact { total, by_status })
    } else {
        let files: Vec<FileStatus> = db.list_records()?.into_iter().map(FileStatus::from).collect();
        Ok(StatusReport::Detailed { total: files.len(), files })
    }
}

/// Owns every per-file state transition: fingerprint check, chunk
/// replacement, AST extraction and the final transactional commit.
pub struct Indexer {
    root: PathBuf,
    db: IndexDatabase,
    registry: ParserRegistry,
    chunker: Box<dyn Chunker>,
    store: Box<dyn VectorStore>,
    summarizer: Box<dyn Summarizer>,
    options: IndexerOptions,
}

impl Indexer {
    pub fn new(root: impl AsRef<Path>, db: IndexDatabase, options: IndexerOptions) -> Self {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let registry = ParserRegistry::with_languages(&options.languages);
        let store = ChunkStore::new(db.clone());

        Self {
            root,
            db,
            registry,
            chunker: Box::new(LineChunker::default()),
            store: Box::new(store),
            summarizer: Box::new(SimpleSummarizer::new()),
            options,
        }
    }

    /// Engine wired from configuration: database, languages, chunk sizes
    pub fn from_config(root: impl AsRef<Path>, config: &Config) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let db = IndexDatabase::new(config.db_path(root))?;
        let indexer = Self::new(root, db, IndexerOptions::from_config(config)).with_chunker(Box::new(
            LineChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
        ));
        Ok(indexer)
    }

    pub fn with_chunker(mut self, chunker: Box<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_store(mut self, store: Box<dyn VectorStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db(&self) -> &IndexDatabase {
        &self.db
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    /// Project-relative key for `path` (relative, or absolute inside the root)
    pub fn relative_key(&self, path: &str) -> Option<String> {
        let candidate = Path::new(path);
        let rel = if candidate.is_absolute() {
            candidate.strip_prefix(&self.root).ok()?
        } else {
            candidate
        };

        if rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return None;
        }

        let key = rel
            .components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    /// Index one file. Returns `NotFound` without touching any state when the
    /// file is missing; every other failure is recorded as `failed`.
    pub fn index_file(&self, path: &str) -> IndexOutcome {
        let Some(key) = self.relative_key(path) else {
            warn!("Path outside project root: {}", path);
            return IndexOutcome::NotFound;
        };

        let abs = self.root.join(&key);
        if !abs.is_file() {
            debug!("Not found: {}", key);
            return IndexOutcome::NotFound;
        }

        match self.index_existing(&key, &abs) {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                error!("Failed to index {}: {}", key, message);
                if let Err(mark_err) = self.db.mark_failed(&key, &message) {
                    error!("Failed to record failure for {}: {:#}", key, mark_err);
                }
                IndexOutcome::Failed(message)
            }
        }
    }

    fn index_existing(&self, key: &str, abs: &Path) -> Result<IndexOutcome> {
        let record = self.db.get_or_create_record(key)?;
        let content = std::fs::read_to_string(abs)?;
        let fingerprint = fingerprint(&content);

        if record.status == IndexStatus::Completed && record.fingerprint == fingerprint {
            debug!("Unchanged: {}", key);
            return Ok(IndexOutcome::Unchanged);
        }

        self.db.mark_in_progress(key)?;

        // Old chunks go first so a search never sees stale and fresh side by side
        let removed = self.store.delete_by_file(key)?;
        let chunks = self.chunker.chunk(key, &content);
        let ids = self.store.add(&chunks)?;
        debug!("{}: replaced {} chunks with {}", key, removed, ids.len());

        let (symbols, relationships) = self.extract(key, &content);

        self.db
            .commit_file(key, &fingerprint, ids.len(), &symbols, &relationships)
            .map_err(IndexError::Store)?;

        info!(
            "Indexed {}: {} chunks, {} symbols, {} relationships",
            key,
            ids.len(),
            symbols.len(),
            relationships.len()
        );

        Ok(IndexOutcome::Indexed {
            chunks: ids.len(),
            symbols: symbols.len(),
            relationships: relationships.len(),
        })
    }

    /// AST step. Anything that stops extraction yields an empty graph, which
    /// still replaces the file's previous one on commit.
    fn extract(&self, key: &str, content: &str) -> (Vec<Symbol>, Vec<Relationship>) {
        if !self.options.enable_ast {
            return (Vec::new(), Vec::new());
        }
        if content.len() as u64 > self.options.ast_max_file_size {
            debug!("Skipping AST for {}: {} bytes over ceiling", key, content.len());
            return (Vec::new(), Vec::new());
        }
        if !self.registry.supports(key) {
            debug!("No extractor for {}", key);
            return (Vec::new(), Vec::new());
        }

        let analysis = self.registry.analyze(key, content);
        if let Some(err) = &analysis.error {
            warn!("AST extraction failed for {}: {}", key, err);
            return (Vec::new(), Vec::new());
        }
        if analysis.has_syntax_errors {
            debug!("{} has syntax errors; extracted best effort", key);
        }

        (analysis.symbols, analysis.relationships)
    }

    /// Remove a file's chunks, graph, summary and record. Deleting an
    /// unknown path succeeds and removes nothing.
    pub fn delete_file(&self, path: &str) -> Result<FileDeletion> {
        let Some(key) = self.relative_key(path) else {
            return Ok(FileDeletion::default());
        };

        let chunks = self.store.delete_by_file(&key)?;
        let mut deletion = self.db.delete_file_data(&key)?;
        deletion.chunks = chunks;

        if deletion.record {
            info!("Removed {} from index ({} chunks, {} symbols)", key, chunks, deletion.symbols);
        }
        Ok(deletion)
    }

    /// Status counts, or per-file detail when `compact` is false
    pub fn get_status(&self, compact: bool) -> Result<StatusReport> {
        status_report(&self.db, compact)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        Ok(self.db.get_stats()?)
    }

    /// Read a file for the summary batch
    pub fn summary_input(&self, path: &str) -> Option<SummaryInput> {
        let key = self.relative_key(path)?;
        let content = std::fs::read_to_string(self.root.join(&key)).ok()?;
        Some(SummaryInput {
            language: detect_language(&key).map(str::to_string),
            path: key,
            content,
        })
    }

    /// Summarize a batch with one load/unload of the summarizer. Failures are
    /// per file; returns how many summaries were stored.
    pub fn batch_summarize_files(&self, files: &[SummaryInput]) -> usize {
        if files.is_empty() {
            return 0;
        }

        if let Err(e) = self.summarizer.load() {
            warn!("Failed to load summarizer {}: {:#}", self.summarizer.name(), e);
            return 0;
        }

        let mut stored = 0;
        for file in files {
            let summary = self
                .summarizer
                .summarize(&file.path, &file.content, file.language.as_deref())
                .and_then(|summary| {
                    self.db.upsert_summary(
                        &file.path,
                        &summary,
                        file.language.as_deref(),
                        file.content.lines().count(),
                    )
                });
            match summary {
                Ok(()) => stored += 1,
                Err(e) => warn!("Failed to summarize {}: {:#}", file.path, e),
            }
        }

        self.summarizer.unload();
        info!("Summarized {}/{} files", stored, files.len());
        stored
    }
}
