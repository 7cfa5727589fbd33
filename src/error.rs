// Error taxonomy for indexing

use thiserror::Error;

/// Errors raised while indexing a repository.
///
/// Extraction problems (`UnsupportedLanguage`, `Parse`) never escape the AST
/// step; they are folded into the file's analysis result. Everything else
/// marks the file `failed` and is retried on the next cycle that selects it.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("unsupported file type: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to parse {language} code: {message}")]
    Parse { language: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
