// Chunk storage and keyword search

use anyhow::{Context, Result};
use rusqlite::params;
use serde::Serialize;
use tracing::debug;

use super::chunker::Chunk;
use crate::index::db::IndexDatabase;

/// One ranked search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub file_path: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: Option<String>,
    /// Higher is better
    pub score: f64,
}

/// Storage for derived chunks, searchable by query text
pub trait VectorStore: Send + Sync {
    /// Store chunks and return their ids, in input order
    fn add(&self, chunks: &[Chunk]) -> Result<Vec<i64>>;

    /// Remove every chunk of a file; returns how many were removed
    fn delete_by_file(&self, path: &str) -> Result<usize>;

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// SQLite FTS5-backed chunk store ranked with bm25
#[derive(Clone)]
pub struct ChunkStore {
    db: IndexDatabase,
}

impl ChunkStore {
    pub fn new(db: IndexDatabase) -> Self {
        Self { db }
    }
}

impl VectorStore for ChunkStore {
    fn add(&self, chunks: &[Chunk]) -> Result<Vec<i64>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.db.get_conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(chunks.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (file_path, content, start_line, end_line, language)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    chunk.file_path,
                    chunk.content,
                    chunk.start_line as i64,
                    chunk.end_line as i64,
                    chunk.language,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit().context("Failed to commit chunks")?;

        debug!("Stored {} chunks", ids.len());
        Ok(ids)
    }

    fn delete_by_file(&self, path: &str) -> Result<usize> {
        let conn = self.db.get_conn()?;
        let removed = conn.execute("DELETE FROM chunks WHERE file_path = ?1", [path])?;
        Ok(removed)
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };

        let conn = self.db.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.file_path, c.content, c.start_line, c.end_line, c.language,
                    bm25(chunks_fts) AS rank
             FROM chunks_fts
             JOIN chunks c ON c.id = chunks_fts.rowid
             WHERE chunks_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;

        let hits = stmt
            .query_map(params![expr, k as i64], |row| {
                Ok(SearchHit {
                    chunk_id: row.get(0)?,
                    file_path: row.get(1)?,
                    content: row.get(2)?,
                    start_line: row.get::<_, i64>(3)? as usize,
                    end_line: row.get::<_, i64>(4)? as usize,
                    language: row.get(5)?,
                    score: -row.get::<_, f64>(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Chunk search failed")?;

        Ok(hits)
    }
}

/// Quote each word so user input never reaches the FTS5 query syntax
fn match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{}\"", term))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
