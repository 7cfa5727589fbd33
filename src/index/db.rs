use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::schema::{drop_schema, init_schema};
use super::{IndexRecord, IndexStatus, Relationship, Symbol, UnknownVariant};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

const RECORD_COLUMNS: &str =
    "path, fingerprint, status, unit_count, error_message, indexed_at, created_at, updated_at";

pub(crate) const SYMBOL_COLUMNS: &str =
    "name, kind, file_path, line_start, line_end, signature, docstring, parent_symbol, is_exported";

const RELATIONSHIP_COLUMNS: &str =
    "source_file, source_symbol, source_line, target_file, target_symbol, kind, is_external";

/// Stored natural-language summary of one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: String,
    pub summary: String,
    pub language: Option<String>,
    pub loc: usize,
    pub updated_at: DateTime<Utc>,
}

/// What `delete_file_data` removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileDeletion {
    /// Filled in by the indexer, which owns the chunk store
    pub chunks: usize,
    pub symbols: usize,
    pub relationships: usize,
    pub summary: bool,
    pub record: bool,
}

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub total_symbols: usize,
    pub total_relationships: usize,
    pub total_chunks: usize,
    pub total_summaries: usize,
}

/// Database connection manager
#[derive(Clone)]
pub struct IndexDatabase {
    pool: ConnectionPool,
    db_path: PathBuf,
}

impl IndexDatabase {
    /// Create or open a database
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        info!("Opening database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // WAL lets readers see the last committed state while a file commits
        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        });

        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .context("Failed to create connection pool")?;

        {
            let conn = pool.get().context("Failed to get connection")?;
            init_schema(&conn).context("Failed to initialize schema")?;
        }

        Ok(Self { pool, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().context("Failed to get connection from pool")
    }

    /// Fetch the record for `path`, creating a `queued` one with an empty
    /// fingerprint if none exists.
    pub fn get_or_create_record(&self, path: &str) -> Result<IndexRecord> {
        let conn = self.get_conn()?;
        let now = now().to_rfc3339();

        let created = conn.execute(
            "INSERT OR IGNORE INTO indexed_files (path, fingerprint, status, created_at, updated_at)
             VALUES (?1, '', 'queued', ?2, ?2)",
            params![path, now],
        )?;
        if created > 0 {
            debug!("Created index record for {}", path);
        }

        let record = conn
            .query_row(
                &format!("SELECT {} FROM indexed_files WHERE path = ?1", RECORD_COLUMNS),
                [path],
                row_to_record,
            )
            .with_context(|| format!("Failed to load index record for {}", path))?;

        Ok(record)
    }

    /// Get the record for `path`, if any
    pub fn get_record(&self, path: &str) -> Result<Option<IndexRecord>> {
        let conn = self.get_conn()?;

        let record = conn
            .query_row(
                &format!("SELECT {} FROM indexed_files WHERE path = ?1", RECORD_COLUMNS),
                [path],
                row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// Persist `in_progress` before any derived data is touched
    pub fn mark_in_progress(&self, path: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE indexed_files SET status = 'in_progress', updated_at = ?2 WHERE path = ?1",
            params![path, now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record a whole-file failure. The fingerprint is left as it was so the
    /// next attempt is never short-circuited.
    pub fn mark_failed(&self, path: &str, message: &str) -> Result<()> {
        let conn = self.get_conn()?;
        let now = now().to_rfc3339();
        conn.execute(
            "INSERT INTO indexed_files (path, fingerprint, status, error_message, created_at, updated_at)
             VALUES (?1, '', 'failed', ?2, ?3, ?3)
             ON CONFLICT(path) DO UPDATE SET
                status = 'failed', error_message = excluded.error_message, updated_at = excluded.updated_at",
            params![path, message, now],
        )?;
        Ok(())
    }

    /// Replace the file's symbols and relationships and flip its record to
    /// `completed`, all in one transaction.
    pub fn commit_file(
        &self,
        path: &str,
        fingerprint: &str,
        unit_count: usize,
        symbols: &[Symbol],
        relationships: &[Relationship],
    ) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = now().to_rfc3339();

        tx.execute("DELETE FROM symbols WHERE file_path = ?1", [path])?;
        tx.execute("DELETE FROM relationships WHERE source_file = ?1", [path])?;

        {
            let mut insert_symbol = tx.prepare(&format!(
                "INSERT INTO symbols ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                SYMBOL_COLUMNS
            ))?;
            for symbol in symbols {
                insert_symbol.execute(params![
                    symbol.name,
                    symbol.kind.as_str(),
                    path,
                    symbol.line_start as i64,
                    symbol.line_end as i64,
                    symbol.signature,
                    symbol.docstring,
                    symbol.parent_symbol,
                    symbol.is_exported,
                ])?;
            }

            let mut insert_relationship = tx.prepare(&format!(
                "INSERT INTO relationships ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                RELATIONSHIP_COLUMNS
            ))?;
            for rel in relationships {
                insert_relationship.execute(params![
                    path,
                    rel.source_symbol,
                    rel.source_line as i64,
                    rel.target_file,
                    rel.target_symbol,
                    rel.kind.as_str(),
                    rel.is_external,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO indexed_files
                (path, fingerprint, status, unit_count, error_message, indexed_at, created_at, updated_at)
             VALUES (?1, ?2, 'completed', ?3, NULL, ?4, ?4, ?4)
             ON CONFLICT(path) DO UPDATE SET
                fingerprint = excluded.fingerprint,
                status = 'completed',
                unit_count = excluded.unit_count,
                error_message = NULL,
                indexed_at = excluded.indexed_at,
                updated_at = excluded.updated_at",
            params![path, fingerprint, unit_count as i64, now],
        )?;

        tx.commit().with_context(|| format!("Failed to commit index data for {}", path))?;

        debug!(
            "Committed {}: {} symbols, {} relationships",
            path,
            symbols.len(),
            relationships.len()
        );

        Ok(())
    }

    /// Remove the file's graph, summary and record in one transaction.
    /// Deleting an unknown path removes nothing and succeeds.
    pub fn delete_file_data(&self, path: &str) -> Result<FileDeletion> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let symbols = tx.execute("DELETE FROM symbols WHERE file_path = ?1", [path])?;
        let relationships = tx.execute("DELETE FROM relationships WHERE source_file = ?1", [path])?;
        let summary = tx.execute("DELETE FROM file_summaries WHERE path = ?1", [path])? > 0;
        let record = tx.execute("DELETE FROM indexed_files WHERE path = ?1", [path])? > 0;

        tx.commit()?;

        Ok(FileDeletion { chunks: 0, symbols, relationships, summary, record })
    }

    /// All records, ordered by path
    pub fn list_records(&self) -> Result<Vec<IndexRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM indexed_files ORDER BY path",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Record counts keyed by status tag
    pub fn count_by_status(&self) -> Result<BTreeMap<String, usize>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM indexed_files GROUP BY status")?;

        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        Ok(counts)
    }

    /// Every path that has a record, regardless of status
    pub fn indexed_paths(&self) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT path FROM indexed_files ORDER BY path")?;

        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(paths)
    }

    /// Symbols committed for one file, in source order
    pub fn symbols_in_file(&self, path: &str) -> Result<Vec<Symbol>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM symbols WHERE file_path = ?1 ORDER BY line_start, id",
            SYMBOL_COLUMNS
        ))?;

        let symbols = stmt
            .query_map([path], row_to_symbol)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(symbols)
    }

    /// Relationships whose source is the given file
    pub fn relationships_from_file(&self, path: &str) -> Result<Vec<Relationship>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM relationships WHERE source_file = ?1 ORDER BY source_line, id",
            RELATIONSHIP_COLUMNS
        ))?;

        let relationships = stmt
            .query_map([path], row_to_relationship)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(relationships)
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row("SELECT value FROM index_meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO index_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn upsert_summary(&self, path: &str, summary: &str, language: Option<&str>, loc: usize) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO file_summaries (path, summary, language, loc, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
                summary = excluded.summary,
                language = excluded.language,
                loc = excluded.loc,
                updated_at = excluded.updated_at",
            params![path, summary, language, loc as i64, now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_summary(&self, path: &str) -> Result<Option<FileSummary>> {
        let conn = self.get_conn()?;
        let summary = conn
            .query_row(
                "SELECT path, summary, language, loc, updated_at FROM file_summaries WHERE path = ?1",
                [path],
                row_to_summary,
            )
            .optional()?;
        Ok(summary)
    }

    /// Summaries whose text or path contains `query`
    pub fn search_summaries(&self, query: &str, limit: usize) -> Result<Vec<FileSummary>> {
        let conn = self.get_conn()?;
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            "SELECT path, summary, language, loc, updated_at FROM file_summaries
             WHERE summary LIKE ?1 OR path LIKE ?1
             ORDER BY path
             LIMIT ?2",
        )?;

        let summaries = stmt
            .query_map(params![pattern, limit as i64], row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    /// Get index statistics
    pub fn get_stats(&self) -> Result<IndexStats> {
        let conn = self.get_conn()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(IndexStats {
            total_files: count("SELECT COUNT(*) FROM indexed_files")?,
            completed_files: count("SELECT COUNT(*) FROM indexed_files WHERE status = 'completed'")?,
            failed_files: count("SELECT COUNT(*) FROM indexed_files WHERE status = 'failed'")?,
            total_symbols: count("SELECT COUNT(*) FROM symbols")?,
            total_relationships: count("SELECT COUNT(*) FROM relationships")?,
            total_chunks: count("SELECT COUNT(*) FROM chunks")?,
            total_summaries: count("SELECT COUNT(*) FROM file_summaries")?,
        })
    }

    /// Drop and recreate every table
    pub fn reset(&self) -> Result<()> {
        let conn = self.get_conn()?;
        drop_schema(&conn).context("Failed to drop schema")?;
        init_schema(&conn).context("Failed to initialize schema")?;
        info!("Index at {} reset", self.db_path.display());
        Ok(())
    }
}

/// Parse a stored tag column into its enum
pub(crate) fn parse_tag<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_time(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => parse_time(row, idx).map(Some),
        None => Ok(None),
    }
}

/// Convert database row to IndexRecord
fn row_to_record(row: &Row) -> rusqlite::Result<IndexRecord> {
    Ok(IndexRecord {
        file_path: row.get(0)?,
        fingerprint: row.get(1)?,
        status: parse_tag::<IndexStatus>(row, 2)?,
        unit_count: row.get::<_, i64>(3)? as usize,
        error_message: row.get(4)?,
        indexed_at: parse_optional_time(row, 5)?,
        created_at: parse_time(row, 6)?,
        updated_at: parse_time(row, 7)?,
    })
}

/// Convert database row (in `SYMBOL_COLUMNS` order) to Symbol
pub(crate) fn row_to_symbol(row: &Row) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        name: row.get(0)?,
        kind: parse_tag(row, 1)?,
        file_path: row.get(2)?,
        line_start: row.get::<_, i64>(3)? as usize,
        line_end: row.get::<_, i64>(4)? as usize,
        signature: row.get(5)?,
        docstring: row.get(6)?,
        parent_symbol: row.get(7)?,
        is_exported: row.get(8)?,
    })
}

fn row_to_relationship(row: &Row) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        source_file: row.get(0)?,
        source_symbol: row.get(1)?,
        source_line: row.get::<_, i64>(2)? as usize,
        target_file: row.get(3)?,
        target_symbol: row.get(4)?,
        kind: parse_tag(row, 5)?,
        is_external: row.get(6)?,
    })
}

fn row_to_summary(row: &Row) -> rusqlite::Result<FileSummary> {
    Ok(FileSummary {
        path: row.get(0)?,
        summary: row.get(1)?,
        language: row.get(2)?,
        loc: row.get::<_, i64>(3)? as usize,
        updated_at: parse_time(row, 4)?,
    })
}

/// Current UTC time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{RelationshipKind, SymbolKind, MODULE_SCOPE};
    use tempfile::tempdir;

    fn call(file: &str, from: &str, to: &str, line: usize) -> Relationship {
        Relationship {
            source_file: file.to_string(),
            source_symbol: from.to_string(),
            source_line: line,
            target_file: None,
            target_symbol: to.to_string(),
            kind: RelationshipKind::Calls,
            is_external: false,
        }
    }

    #[test]
    fn test_create_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let db = IndexDatabase::new(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(db.db_path(), db_path.as_path());
    }

    #[test]
    fn test_record_lifecycle() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        let record = db.get_or_create_record("a.py").unwrap();
        assert_eq!(record.status, IndexStatus::Queued);
        assert!(record.fingerprint.is_empty());
        assert!(record.indexed_at.is_none());

        db.mark_in_progress("a.py").unwrap();
        assert_eq!(db.get_record("a.py").unwrap().unwrap().status, IndexStatus::InProgress);

        db.commit_file("a.py", "abc", 3, &[], &[]).unwrap();
        let record = db.get_record("a.py").unwrap().unwrap();
        assert_eq!(record.status, IndexStatus::Completed);
        assert_eq!(record.fingerprint, "abc");
        assert_eq!(record.unit_count, 3);
        assert!(record.indexed_at.is_some());

        // A second create leaves the existing record alone
        let again = db.get_or_create_record("a.py").unwrap();
        assert_eq!(again.status, IndexStatus::Completed);
    }

    #[test]
    fn test_mark_failed_keeps_fingerprint() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        db.get_or_create_record("a.py").unwrap();
        db.commit_file("a.py", "abc", 1, &[], &[]).unwrap();
        db.mark_failed("a.py", "disk on fire").unwrap();

        let record = db.get_record("a.py").unwrap().unwrap();
        assert_eq!(record.status, IndexStatus::Failed);
        assert_eq!(record.fingerprint, "abc");
        assert_eq!(record.error_message.as_deref(), Some("disk on fire"));

        db.mark_failed("never_seen.py", "boom").unwrap();
        assert_eq!(db.get_record("never_seen.py").unwrap().unwrap().status, IndexStatus::Failed);
    }

    #[test]
    fn test_commit_replaces_graph() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        let symbols = vec![
            Symbol::new("f", SymbolKind::Function, "a.py", 1, 1),
            Symbol::new("g", SymbolKind::Function, "a.py", 2, 2),
        ];
        let rels = vec![call("a.py", "f", "g", 1), call("a.py", "f", "g", 1)];

        db.get_or_create_record("a.py").unwrap();
        db.commit_file("a.py", "v1", 1, &symbols, &rels).unwrap();
        assert_eq!(db.relationships_from_file("a.py").unwrap().len(), 2);

        db.commit_file("a.py", "v1", 1, &symbols, &rels).unwrap();
        assert_eq!(db.relationships_from_file("a.py").unwrap().len(), 2);
        assert_eq!(db.symbols_in_file("a.py").unwrap().len(), 2);

        db.commit_file("a.py", "v2", 1, &symbols[..1], &[]).unwrap();
        assert!(db.relationships_from_file("a.py").unwrap().is_empty());
        let stored = db.symbols_in_file("a.py").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "f");
    }

    #[test]
    fn test_delete_file_data() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        let import = Relationship {
            source_file: "a.py".to_string(),
            source_symbol: MODULE_SCOPE.to_string(),
            source_line: 1,
            target_file: None,
            target_symbol: "os".to_string(),
            kind: RelationshipKind::Imports,
            is_external: true,
        };
        db.get_or_create_record("a.py").unwrap();
        db.commit_file(
            "a.py",
            "v1",
            1,
            &[Symbol::new("f", SymbolKind::Function, "a.py", 1, 2)],
            &[import],
        )
        .unwrap();
        db.upsert_summary("a.py", "Python file", Some("python"), 2).unwrap();

        let removed = db.delete_file_data("a.py").unwrap();
        assert_eq!(
            removed,
            FileDeletion { chunks: 0, symbols: 1, relationships: 1, summary: true, record: true }
        );
        assert!(db.get_record("a.py").unwrap().is_none());

        let again = db.delete_file_data("a.py").unwrap();
        assert_eq!(again, FileDeletion::default());
    }

    #[test]
    fn test_counts_and_meta() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        db.get_or_create_record("a.py").unwrap();
        db.get_or_create_record("b.py").unwrap();
        db.commit_file("b.py", "x", 0, &[], &[]).unwrap();

        let counts = db.count_by_status().unwrap();
        assert_eq!(counts.get("queued"), Some(&1));
        assert_eq!(counts.get("completed"), Some(&1));
        assert_eq!(db.indexed_paths().unwrap(), vec!["a.py", "b.py"]);

        assert!(db.get_meta("last_checkpoint").unwrap().is_none());
        db.set_meta("last_checkpoint", "abc").unwrap();
        db.set_meta("last_checkpoint", "def").unwrap();
        assert_eq!(db.get_meta("last_checkpoint").unwrap().as_deref(), Some("def"));
    }

    #[test]
    fn test_summaries_search() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        db.upsert_summary("auth/login.py", "Handles user login", Some("python"), 40).unwrap();
        db.upsert_summary("util.py", "String helpers", Some("python"), 10).unwrap();

        let hits = db.search_summaries("login", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "auth/login.py");
        assert_eq!(db.get_summary("util.py").unwrap().unwrap().loc, 10);
    }

    #[test]
    fn test_stats_and_reset() {
        let dir = tempdir().unwrap();
        let db = IndexDatabase::new(dir.path().join("test.db")).unwrap();

        db.get_or_create_record("a.py").unwrap();
        db.commit_file(
            "a.py",
            "v1",
            0,
            &[Symbol::new("f", SymbolKind::Function, "a.py", 1, 1)],
            &[],
        )
        .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.completed_files, 1);
        assert_eq!(stats.total_symbols, 1);

        db.reset().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_symbols, 0);
    }
}
