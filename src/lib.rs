//! Incremental symbol and relationship index for source repositories.
//!
//! Files are parsed with tree-sitter into symbols and `calls` / `imports` /
//! `inherits` edges, stored per file in SQLite and kept current by an
//! interval scheduler driven by git deltas.

pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod query;

pub use error::{IndexError, Result};
