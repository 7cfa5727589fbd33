// Index data model: symbols, relationships and per-file records

pub mod schema;
pub mod db;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source symbol used for module-level relationships (imports).
pub const MODULE_SCOPE: &str = "__module__";

/// Error returned when a stored tag does not name a known variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct UnknownVariant {
    pub what: &'static str,
    pub value: String,
}

/// Symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Variable,
    /// Accepted from stored rows; extractors record imports as relationships
    Import,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Import => "import",
        }
    }
}

impl FromStr for SymbolKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(SymbolKind::Function),
            "method" => Ok(SymbolKind::Method),
            "class" => Ok(SymbolKind::Class),
            "variable" => Ok(SymbolKind::Variable),
            "import" => Ok(SymbolKind::Import),
            _ => Err(UnknownVariant { what: "symbol kind", value: s.to_string() }),
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named declaration extracted from a source file.
///
/// Lines are 1-based and inclusive; `line_start <= line_end` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    /// Enclosing class for methods. Best effort, not a foreign key.
    pub parent_symbol: Option<String>,
    pub is_exported: bool,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
    ) -> Self {
        debug_assert!(line_start <= line_end);
        Self {
            name: name.into(),
            kind,
            file_path: file_path.into(),
            line_start,
            line_end: line_end.max(line_start),
            signature: None,
            docstring: None,
            parent_symbol: None,
            is_exported: true,
        }
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_docstring(mut self, docstring: Option<String>) -> Self {
        self.docstring = docstring;
        self
    }

    pub fn with_parent(mut self, parent: Option<&str>) -> Self {
        self.parent_symbol = parent.map(str::to_string);
        self
    }

    pub fn exported(mut self, is_exported: bool) -> Self {
        self.is_exported = is_exported;
        self
    }
}

/// Relationship kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Calls,
    Imports,
    Inherits,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Calls => "calls",
            RelationshipKind::Imports => "imports",
            RelationshipKind::Inherits => "inherits",
        }
    }
}

impl FromStr for RelationshipKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calls" => Ok(RelationshipKind::Calls),
            "imports" => Ok(RelationshipKind::Imports),
            "inherits" => Ok(RelationshipKind::Inherits),
            _ => Err(UnknownVariant { what: "relationship kind", value: s.to_string() }),
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge from a symbol to a target resolved by name only.
///
/// Relationships form a multiset: the same call made twice on one line is
/// stored twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_file: String,
    pub source_symbol: String,
    pub source_line: usize,
    /// `None` when the target is external or unresolved.
    pub target_file: Option<String>,
    pub target_symbol: String,
    pub kind: RelationshipKind,
    pub is_external: bool,
}

/// Per-file indexing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Queued => "queued",
            IndexStatus::InProgress => "in_progress",
            IndexStatus::Completed => "completed",
            IndexStatus::Failed => "failed",
        }
    }
}

impl FromStr for IndexStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(IndexStatus::Queued),
            "in_progress" => Ok(IndexStatus::InProgress),
            "completed" => Ok(IndexStatus::Completed),
            "failed" => Ok(IndexStatus::Failed),
            _ => Err(UnknownVariant { what: "index status", value: s.to_string() }),
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indexing state of one file, keyed by its project-relative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub file_path: String,
    /// Fingerprint of the last successfully processed content; empty until then.
    pub fingerprint: String,
    pub status: IndexStatus,
    /// Number of chunks handed to the vector store.
    pub unit_count: usize,
    pub error_message: Option<String>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content fingerprint (BLAKE3, hex encoded)
pub fn fingerprint(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_tags() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Class,
            SymbolKind::Variable,
            SymbolKind::Import,
        ] {
            assert_eq!(kind.as_str().parse::<SymbolKind>().unwrap(), kind);
        }
        assert!("struct".parse::<SymbolKind>().is_err());
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(IndexStatus::InProgress.as_str(), "in_progress");
        assert_eq!("failed".parse::<IndexStatus>().unwrap(), IndexStatus::Failed);
        let err = "done".parse::<IndexStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown index status: done");
    }

    #[test]
    fn test_symbol_builder_defaults() {
        let symbol = Symbol::new("run", SymbolKind::Method, "a.py", 3, 7)
            .with_parent(Some("Job"))
            .with_signature(Some("(self)".to_string()));
        assert!(symbol.is_exported);
        assert_eq!(symbol.parent_symbol.as_deref(), Some("Job"));
        assert_eq!(symbol.signature.as_deref(), Some("(self)"));
        assert!(symbol.docstring.is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint("def f(): pass"), fingerprint("def f(): pass"));
        assert_ne!(fingerprint("def f(): pass"), fingerprint("def g(): pass"));
        assert_eq!(fingerprint("").len(), 64);
    }
}
