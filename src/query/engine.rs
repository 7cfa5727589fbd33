// Query execution engine over the committed graph

use anyhow::Result;
use rusqlite::params;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::index::db::{row_to_symbol, FileSummary, IndexDatabase, SYMBOL_COLUMNS};
use crate::index::{IndexStatus, Symbol, SymbolKind, UnknownVariant};
use crate::indexer::store::{ChunkStore, SearchHit, VectorStore};
use crate::indexer::{status_report, StatusReport};

const MAX_IMPORTERS: usize = 50;

/// Which side of the import graph to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Imports,
    Importers,
    Both,
}

impl Direction {
    fn wants_imports(self) -> bool {
        matches!(self, Direction::Imports | Direction::Both)
    }

    fn wants_importers(self) -> bool {
        matches!(self, Direction::Importers | Direction::Both)
    }
}

impl FromStr for Direction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imports" => Ok(Direction::Imports),
            "importers" => Ok(Direction::Importers),
            "both" => Ok(Direction::Both),
            _ => Err(UnknownVariant { what: "direction", value: s.to_string() }),
        }
    }
}

/// How a callee name was matched to a definition. Name-only: two
/// functions called `run` in different files cannot be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Defined in the caller's own file
    Local,
    /// Defined in exactly one file
    Unique { file: String },
    /// Defined in several files
    Ambiguous { candidates: usize },
    /// No definition in the index
    Unresolved,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Local => f.write_str("local"),
            Resolution::Unique { file } => write!(f, "unique ({})", file),
            Resolution::Ambiguous { candidates } => write!(f, "ambiguous ({} files)", candidates),
            Resolution::Unresolved => f.write_str("unresolved"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallerRow {
    pub caller: String,
    pub caller_file: String,
    pub caller_line: usize,
    /// `None` when the caller has no symbol row
    pub caller_kind: Option<SymbolKind>,
    pub signature: Option<String>,
    pub is_external: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalleeRow {
    pub callee: String,
    /// Defining file when the resolution names one
    pub callee_file: Option<String>,
    pub caller_file: String,
    pub call_line: usize,
    pub is_external: bool,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRow {
    pub module: String,
    pub line: usize,
    pub is_external: bool,
    pub target_file: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImporterRow {
    pub file: String,
    pub line: usize,
    pub module: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyTree {
    pub file: String,
    pub imports: Vec<ImportRow>,
    pub imported_by: Vec<ImporterRow>,
}

/// `is_indexed` answer; `status` is `not_found` for unknown paths
#[derive(Debug, Clone, Serialize)]
pub struct FileIndexState {
    pub indexed: bool,
    pub status: String,
    pub unit_count: Option<usize>,
    pub error: Option<String>,
    pub indexed_at: Option<String>,
}

/// Read-only queries over symbols, relationships, chunks and summaries
pub struct QueryEngine {
    db: IndexDatabase,
    store: ChunkStore,
}

impl QueryEngine {
    pub fn new(db: IndexDatabase) -> Self {
        let store = ChunkStore::new(db.clone());
        Self { db, store }
    }

    /// Everything that calls `symbol`, by name
    pub fn find_callers(&self, symbol: &str, limit: usize) -> Result<Vec<CallerRow>> {
        let conn = self.db.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.source_symbol, r.source_file, r.source_line, r.is_external,
                    (SELECT s.kind FROM symbols s
                     WHERE s.file_path = r.source_file AND s.name = r.source_symbol
                     ORDER BY s.line_start LIMIT 1),
                    (SELECT s.signature FROM symbols s
                     WHERE s.file_path = r.source_file AND s.name = r.source_symbol
                     ORDER BY s.line_start LIMIT 1)
             FROM relationships r
             WHERE r.kind = 'calls' AND r.target_symbol = ?1
             ORDER BY r.source_file, r.source_line, r.id
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![symbol, limit as i64], |row| {
                Ok(CallerRow {
                    caller: row.get(0)?,
                    caller_file: row.get(1)?,
                    caller_line: row.get::<_, i64>(2)? as usize,
                    is_external: row.get(3)?,
                    caller_kind: row.get::<_, Option<String>>(4)?.and_then(|k| k.parse().ok()),
                    signature: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Found {} callers for '{}'", rows.len(), symbol);
        Ok(rows)
    }

    /// Everything `symbol` calls, with a name-based resolution per callee
    pub fn find_callees(&self, symbol: &str, limit: usize) -> Result<Vec<CalleeRow>> {
        let conn = self.db.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT target_symbol, source_file, source_line, is_external, target_file
             FROM relationships
             WHERE kind = 'calls' AND source_symbol = ?1
             ORDER BY source_file, source_line, id
             LIMIT ?2",
        )?;

        let calls = stmt
            .query_map(params![symbol, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? as usize,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut definitions = conn.prepare(
            "SELECT DISTINCT file_path FROM symbols
             WHERE name = ?1 AND kind IN ('function', 'method', 'class')
             ORDER BY file_path",
        )?;
        let mut cache: HashMap<String, Vec<String>> = HashMap::new();
        let mut rows = Vec::with_capacity(calls.len());

        for (callee, caller_file, call_line, is_external, target_file) in calls {
            if !cache.contains_key(&callee) {
                let files = definitions
                    .query_map([&callee], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                cache.insert(callee.clone(), files);
            }
            let files = cache.get(&callee).map(Vec::as_slice).unwrap_or_default();

            let resolution = if files.iter().any(|f| *f == caller_file) {
                Resolution::Local
            } else {
                match files {
                    [] => Resolution::Unresolved,
                    [only] => Resolution::Unique { file: only.clone() },
                    many => Resolution::Ambiguous { candidates: many.len() },
                }
            };
            let callee_file = match &resolution {
                Resolution::Local => Some(caller_file.clone()),
                Resolution::Unique { file } => Some(file.clone()),
                _ => target_file,
            };

            rows.push(CalleeRow {
                callee,
                callee_file,
                caller_file,
                call_line,
                is_external,
                resolution,
            });
        }

        debug!("Found {} callees for '{}'", rows.len(), symbol);
        Ok(rows)
    }

    /// Direct imports of `file` and/or the files importing it
    pub fn dependency_tree(&self, file: &str, direction: Direction) -> Result<DependencyTree> {
        let file = normalize_path(file);
        let conn = self.db.get_conn()?;
        let mut tree = DependencyTree {
            file: file.clone(),
            imports: Vec::new(),
            imported_by: Vec::new(),
        };

        if direction.wants_imports() {
            let mut stmt = conn.prepare(
                "SELECT target_symbol, source_line, is_external, target_file
                 FROM relationships
                 WHERE kind = 'imports' AND source_file = ?1
                 ORDER BY source_line, id",
            )?;
            tree.imports = stmt
                .query_map([&file], |row| {
                    Ok(ImportRow {
                        module: row.get(0)?,
                        line: row.get::<_, i64>(1)? as usize,
                        is_external: row.get(2)?,
                        target_file: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
        }

        if direction.wants_importers() {
            let path = Path::new(&file);
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(&file).to_string();
            let without_ext = path.with_extension("").to_string_lossy().replace('\\', "/");

            let mut stmt = conn.prepare(
                "SELECT source_file, source_line, target_symbol, target_file
                 FROM relationships
                 WHERE kind = 'imports' AND source_file != ?1
                   AND (target_file = ?1 OR target_file = ?2 OR target_symbol LIKE ?3)
                 ORDER BY source_file, source_line, id",
            )?;
            let candidates = stmt
                .query_map(params![file, without_ext, format!("%{}", stem)], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)? as usize,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            tree.imported_by = candidates
                .into_iter()
                .filter(|(_, _, module, target)| {
                    let by_target = target.as_deref().is_some_and(|t| t == file || t == without_ext);
                    by_target || specifier_names_stem(module, &stem)
                })
                .take(MAX_IMPORTERS)
                .map(|(file, line, module, _)| ImporterRow { file, line, module })
                .collect();
        }

        debug!(
            "Dependency tree for {}: {} imports, {} importers",
            file,
            tree.imports.len(),
            tree.imported_by.len()
        );
        Ok(tree)
    }

    pub fn is_indexed(&self, path: &str) -> Result<FileIndexState> {
        let path = normalize_path(path);
        let state = match self.db.get_record(&path)? {
            Some(record) => FileIndexState {
                indexed: record.status == IndexStatus::Completed,
                status: record.status.to_string(),
                unit_count: Some(record.unit_count),
                error: record.error_message,
                indexed_at: record.indexed_at.map(|t| t.to_rfc3339()),
            },
            None => FileIndexState {
                indexed: false,
                status: "not_found".to_string(),
                unit_count: None,
                error: None,
                indexed_at: None,
            },
        };
        Ok(state)
    }

    /// Committed symbols of one file, in line order
    pub fn symbols_in_file(&self, path: &str) -> Result<Vec<Symbol>> {
        Ok(self.db.symbols_in_file(&normalize_path(path))?)
    }

    pub fn status(&self, compact: bool) -> Result<StatusReport> {
        Ok(status_report(&self.db, compact)?)
    }

    /// Symbols whose name contains `query`; exact matches first
    pub fn search_symbols(&self, query: &str, kind: Option<SymbolKind>, limit: usize) -> Result<Vec<Symbol>> {
        let conn = self.db.get_conn()?;
        let pattern = format!("%{}%", query);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM symbols
             WHERE name LIKE ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY name = ?3 DESC, name, file_path, line_start
             LIMIT ?4",
            SYMBOL_COLUMNS
        ))?;

        let symbols = stmt
            .query_map(
                params![pattern, kind.map(|k| k.as_str()), query, limit as i64],
                row_to_symbol,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(symbols)
    }

    /// Ranked chunk search
    pub fn search_chunks(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.store.search(query, k)
    }

    /// Files whose summary or path mentions `query`
    pub fn search_files(&self, query: &str, limit: usize) -> Result<Vec<FileSummary>> {
        self.db.search_summaries(query, limit)
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// `pkg.util`, `./util`, `crate::util` and `.util` all name the stem `util`
fn specifier_names_stem(specifier: &str, stem: &str) -> bool {
    match specifier.strip_suffix(stem) {
        Some(prefix) => prefix.is_empty() || prefix.ends_with(['.', '/', ':']),
        None => false,
    }
}
