use rusqlite::{Connection, Result};
use tracing::{debug, info};

/// SQLite schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    debug!("Initializing repograph schema v{}", SCHEMA_VERSION);

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    debug!("Current schema version: {}", current_version);

    if current_version < SCHEMA_VERSION {
        info!("Upgrading schema from v{} to v{}", current_version, SCHEMA_VERSION);
        apply_migrations(conn, current_version)?;
    }

    Ok(())
}

/// Apply migrations from current version to latest
fn apply_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration v{}", version);
        if version == 1 {
            create_v1_schema(conn)?;
        }

        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    }

    Ok(())
}

/// Create v1 schema (initial schema)
fn create_v1_schema(conn: &Connection) -> Result<()> {
    // Per-file indexing state, one row per project-relative path
    conn.execute(
        "CREATE TABLE IF NOT EXISTS indexed_files (
            path TEXT PRIMARY KEY,
            fingerprint TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'queued',
            unit_count INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            indexed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_indexed_files_status
         ON indexed_files(status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS symbols (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            line_start INTEGER NOT NULL,
            line_end INTEGER NOT NULL,
            parent_symbol TEXT,
            signature TEXT,
            docstring TEXT,
            is_exported INTEGER NOT NULL DEFAULT 1,
            CHECK (line_start <= line_end)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_symbols_file
         ON symbols(file_path)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_symbols_name
         ON symbols(name, kind)",
        [],
    )?;

    // Relationships are keyed by source file for replace-all-on-reindex
    conn.execute(
        "CREATE TABLE IF NOT EXISTS relationships (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_file TEXT NOT NULL,
            source_symbol TEXT NOT NULL,
            source_line INTEGER NOT NULL,
            target_file TEXT,
            target_symbol TEXT NOT NULL,
            kind TEXT NOT NULL,
            is_external INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_relationships_source_file
         ON relationships(source_file)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_relationships_source
         ON relationships(source_symbol, kind)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_relationships_target
         ON relationships(target_symbol, kind)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path TEXT NOT NULL,
            content TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            language TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chunks_file
         ON chunks(file_path)",
        [],
    )?;

    // Full-text index over chunk content
    conn.execute(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
            content,
            content='chunks',
            content_rowid='id'
        )",
        [],
    )?;

    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS chunks_fts_insert AFTER INSERT ON chunks
         BEGIN
             INSERT INTO chunks_fts(rowid, content) VALUES (new.id, new.content);
         END",
        [],
    )?;

    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS chunks_fts_delete AFTER DELETE ON chunks
         BEGIN
             INSERT INTO chunks_fts(chunks_fts, rowid, content)
             VALUES ('delete', old.id, old.content);
         END",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS file_summaries (
            path TEXT PRIMARY KEY,
            summary TEXT NOT NULL,
            language TEXT,
            loc INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Key/value metadata (last checkpoint, last cycle time)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    info!("v1 schema created successfully");

    Ok(())
}

/// Drop all tables (for rebuilding)
pub fn drop_schema(conn: &Connection) -> Result<()> {
    info!("Dropping all schema tables");

    conn.execute("DROP TABLE IF EXISTS schema_version", [])?;
    conn.execute("DROP TABLE IF EXISTS index_meta", [])?;
    conn.execute("DROP TABLE IF EXISTS file_summaries", [])?;
    conn.execute("DROP TRIGGER IF EXISTS chunks_fts_delete", [])?;
    conn.execute("DROP TRIGGER IF EXISTS chunks_fts_insert", [])?;
    conn.execute("DROP TABLE IF EXISTS chunks_fts", [])?;
    conn.execute("DROP TABLE IF EXISTS chunks", [])?;
    conn.execute("DROP TABLE IF EXISTS relationships", [])?;
    conn.execute("DROP TABLE IF EXISTS symbols", [])?;
    conn.execute("DROP TABLE IF EXISTS indexed_files", [])?;

    Ok(())
}
