// Language parsers: grammar registry and per-language extractors

mod go;
mod java;
mod javascript;
mod python;
mod rust;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser as TreeParser, Tree};

use crate::error::IndexError;
use crate::index::{Relationship, RelationshipKind, Symbol, UnknownVariant, MODULE_SCOPE};

pub use go::GoExtractor;
pub use java::JavaExtractor;
pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;

/// Languages with a registered grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    Java,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Rust,
        Language::Go,
        Language::Java,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
            Language::Rust => &["rs"],
            Language::Go => &["go"],
            Language::Java => &["java"],
        }
    }

    /// Resolve from an extension, with or without the leading dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.name() == lower)
            .ok_or_else(|| UnknownVariant { what: "language", value: s.to_string() })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enclosing declarations at a point of the traversal.
///
/// Passed by value down the recursion, so leaving a node restores the
/// outer scope without any bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    pub class: Option<&'a str>,
    pub function: Option<&'a str>,
}

impl<'a> Scope<'a> {
    /// Entering a class body. Calls inside still belong to any enclosing
    /// function until a method is entered.
    pub fn in_class(self, name: &'a str) -> Self {
        Scope { class: Some(name), function: self.function }
    }

    /// Entering a function body. Definitions nested in it are plain functions,
    /// not methods of the outer class.
    pub fn in_function(self, name: &'a str) -> Self {
        Scope { class: None, function: Some(name) }
    }
}

/// Everything one traversal of a file produced
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub file_path: String,
    pub language: Option<Language>,
    pub symbols: Vec<Symbol>,
    pub relationships: Vec<Relationship>,
    /// Import specifiers in source order
    pub imports: Vec<String>,
    /// Set when no extraction happened (unsupported type, no tree)
    pub error: Option<String>,
    /// The tree contained error or missing nodes; extraction was best effort
    pub has_syntax_errors: bool,
}

impl FileAnalysis {
    pub fn new(file_path: &str, language: Language) -> Self {
        Self {
            file_path: file_path.to_string(),
            language: Some(language),
            symbols: Vec::new(),
            relationships: Vec::new(),
            imports: Vec::new(),
            error: None,
            has_syntax_errors: false,
        }
    }

    pub fn failed(file_path: &str, language: Option<Language>, error: impl Into<String>) -> Self {
        Self {
            file_path: file_path.to_string(),
            language,
            symbols: Vec::new(),
            relationships: Vec::new(),
            imports: Vec::new(),
            error: Some(error.into()),
            has_syntax_errors: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn push_symbol(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    /// Record a call. Calls outside any function are not attributed.
    pub fn add_call(&mut self, scope: Scope<'_>, target: &str, line: usize) {
        let Some(caller) = scope.function else {
            return;
        };
        self.relationships.push(Relationship {
            source_file: self.file_path.clone(),
            source_symbol: caller.to_string(),
            source_line: line,
            target_file: None,
            target_symbol: target.to_string(),
            kind: RelationshipKind::Calls,
            is_external: false,
        });
    }

    /// Record a module-level import
    pub fn add_import(&mut self, specifier: &str, line: usize, is_external: bool, target_file: Option<String>) {
        self.imports.push(specifier.to_string());
        self.relationships.push(Relationship {
            source_file: self.file_path.clone(),
            source_symbol: MODULE_SCOPE.to_string(),
            source_line: line,
            target_file,
            target_symbol: specifier.to_string(),
            kind: RelationshipKind::Imports,
            is_external,
        });
    }

    pub fn add_inherits(&mut self, class: &str, base: &str, line: usize) {
        self.relationships.push(Relationship {
            source_file: self.file_path.clone(),
            source_symbol: class.to_string(),
            source_line: line,
            target_file: None,
            target_symbol: base.to_string(),
            kind: RelationshipKind::Inherits,
            is_external: false,
        });
    }
}

/// Walks one language's syntax tree and emits symbols and relationships.
///
/// Implementations must not panic on malformed trees; anything they cannot
/// make sense of is skipped.
pub trait Extractor: Send + Sync {
    fn analyze(&self, file_path: &str, tree: &Tree, content: &str) -> FileAnalysis;
}

/// Maps languages to grammars and extractors
pub struct ParserRegistry {
    extractors: HashMap<Language, Box<dyn Extractor>>,
}

impl ParserRegistry {
    /// Registry with every built-in language
    pub fn new() -> Self {
        Self::with_languages(&Language::ALL)
    }

    /// Registry restricted to the given languages
    pub fn with_languages(languages: &[Language]) -> Self {
        let mut registry = Self { extractors: HashMap::new() };
        for &language in languages {
            let extractor: Box<dyn Extractor> = match language {
                Language::Python => Box::new(PythonExtractor::new()),
                Language::JavaScript | Language::TypeScript | Language::Tsx => {
                    Box::new(JavaScriptExtractor::new(language))
                }
                Language::Rust => Box::new(RustExtractor::new()),
                Language::Go => Box::new(GoExtractor::new()),
                Language::Java => Box::new(JavaExtractor::new()),
            };
            registry.register(language, extractor);
        }
        registry
    }

    /// Register or replace the extractor for a language
    pub fn register(&mut self, language: Language, extractor: Box<dyn Extractor>) {
        debug!("Registering extractor for {}", language);
        self.extractors.insert(language, extractor);
    }

    /// Language of a path, if an extractor is registered for it
    pub fn resolve_language(&self, path: &str) -> Option<Language> {
        Language::from_path(Path::new(path)).filter(|lang| self.extractors.contains_key(lang))
    }

    pub fn supports(&self, path: &str) -> bool {
        self.resolve_language(path).is_some()
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.extractors.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Produce a syntax tree. Trees with error nodes are still returned.
    pub fn parse(&self, language: Language, content: &str) -> Result<Tree, IndexError> {
        let mut parser = TreeParser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| IndexError::Parse {
                language: language.to_string(),
                message: e.to_string(),
            })?;

        parser.parse(content, None).ok_or_else(|| IndexError::Parse {
            language: language.to_string(),
            message: "parser produced no tree".to_string(),
        })
    }

    /// Extract symbols and relationships from one file. Never fails: problems
    /// are reported through `FileAnalysis::error`.
    pub fn analyze(&self, file_path: &str, content: &str) -> FileAnalysis {
        let language = match self.resolve_language(file_path) {
            Some(language) => language,
            None => {
                let ext = Path::new(file_path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e))
                    .unwrap_or_default();
                return FileAnalysis::failed(
                    file_path,
                    None,
                    IndexError::UnsupportedLanguage(ext).to_string(),
                );
            }
        };

        let Some(extractor) = self.extractors.get(&language) else {
            return FileAnalysis::failed(
                file_path,
                Some(language),
                IndexError::UnsupportedLanguage(language.to_string()).to_string(),
            );
        };

        let tree = match self.parse(language, content) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("{}: {}", file_path, e);
                return FileAnalysis::failed(file_path, Some(language), e.to_string());
            }
        };

        let mut analysis = extractor.analyze(file_path, &tree, content);
        analysis.has_syntax_errors = tree.root_node().has_error();
        if analysis.has_syntax_errors {
            debug!("{} has syntax errors; extraction is best effort", file_path);
        }

        analysis
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Source text of a node; empty on invalid UTF-8 boundaries
pub(crate) fn node_text<'a>(node: Node<'_>, content: &'a str) -> &'a str {
    content.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Text of a named field, if the node has it
pub(crate) fn field_text<'a>(node: Node<'_>, field: &str, content: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, content))
        .filter(|text| !text.is_empty())
}

/// 1-based first line
pub(crate) fn start_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// 1-based last line
pub(crate) fn end_line(node: Node<'_>) -> usize {
    node.end_position().row + 1
}

/// Strip one layer of matching quotes from a string literal
pub(crate) fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Comments directly above `node` that start with `marker` (`///`, `//`,
/// `/**`), joined with markers and decoration stripped. Attributes and
/// annotations between the comment and the item are skipped; a blank line
/// ends the block.
pub(crate) fn doc_comment(node: Node<'_>, src: &str, marker: &str) -> Option<String> {
    let mut blocks = Vec::new();
    let mut next_row = node.start_position().row;
    let mut current = node.prev_sibling();

    while let Some(sibling) = current {
        match sibling.kind() {
            "attribute_item" | "annotation" | "marker_annotation" => {}
            "line_comment" | "block_comment" | "comment" => {
                let text = node_text(sibling, src).trim();
                if !text.starts_with(marker) || sibling.end_position().row + 1 < next_row {
                    break;
                }
                blocks.push(text);
            }
            _ => break,
        }
        next_row = sibling.start_position().row;
        current = sibling.prev_sibling();
    }

    let lines: Vec<&str> = blocks
        .iter()
        .rev()
        .flat_map(|block| block.lines())
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix(marker).unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line).trim();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Directory part of a `/`-separated relative path
fn parent_dir(file_path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = file_path.split('/').filter(|p| !p.is_empty()).collect();
    parts.pop();
    parts
}

/// Resolve a `./` or `../` specifier against the importing file, lexically.
/// Returns `None` for bare specifiers or paths escaping the project root.
pub(crate) fn resolve_relative_path(file_path: &str, specifier: &str) -> Option<String> {
    if let Some(rooted) = specifier.strip_prefix('/') {
        return Some(rooted.to_string());
    }
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }

    let mut parts = parent_dir(file_path);
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Resolve a Python relative module (`.util`, `..pkg.mod`) to a file path
pub(crate) fn resolve_python_module(file_path: &str, module: &str) -> Option<String> {
    let dots = module.chars().take_while(|c| *c == '.').count();
    if dots == 0 {
        return None;
    }

    let mut parts = parent_dir(file_path);
    for _ in 1..dots {
        parts.pop()?;
    }

    let rest = &module[dots..];
    if rest.is_empty() {
        parts.push("__init__.py");
        return Some(parts.join("/"));
    }

    let mut joined: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
    joined.extend(rest.split('.').filter(|p| !p.is_empty()).map(str::to_string));
    if let Some(last) = joined.last_mut() {
        last.push_str(".py");
    }
    Some(joined.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SymbolKind;
    use proptest::prelude::*;

    const SAMPLES: [(&str, &str); 7] = [
        (
            "m.py",
            "import os\nfrom .util import helper\n\nclass A(Base):\n    \"\"\"Doc.\"\"\"\n    def run(self, x):\n        helper(x)\n        return os.getcwd()\n\ndef main():\n    A().run(1)\n",
        ),
        (
            "m.js",
            "import { helper } from './util';\nconst fs = require('fs');\n\nclass A extends Base {\n  run(x) {\n    return helper(x);\n  }\n}\n\nexport const main = () => new A().run(1);\n",
        ),
        (
            "m.ts",
            "import { helper } from './util';\n\nexport class A extends Base {\n  run(x: number): number {\n    return helper(x);\n  }\n}\n\nfunction main(): void {\n  new A().run(1);\n}\n",
        ),
        (
            "m.tsx",
            "import React from 'react';\n\nexport function View(props: Props) {\n  return <div>{render(props)}</div>;\n}\n",
        ),
        (
            "m.rs",
            "use crate::util::helper;\n\npub struct A;\n\nimpl Runner for A {\n    fn run(&self, x: u32) -> u32 {\n        helper(x)\n    }\n}\n\nfn main() {\n    A.run(1);\n}\n",
        ),
        (
            "m.go",
            "package main\n\nimport \"fmt\"\n\ntype A struct{}\n\nfunc (a *A) Run(x int) int {\n\treturn helper(x)\n}\n\nfunc main() {\n\tfmt.Println(1)\n}\n",
        ),
        (
            "M.java",
            "import java.util.List;\n\npublic class M extends Base implements Runner {\n    public int run(int x) {\n        return helper(x);\n    }\n}\n",
        ),
    ];

    /// Splices `insert` into a known-good sample and cuts it at `cut`
    fn mutate(sample: &str, at: prop::sample::Index, insert: &str, cut: prop::sample::Index) -> String {
        let at = at.index(sample.len() + 1);
        let mut source = format!("{}{}{}", &sample[..at], insert, &sample[at..]);
        source.truncate(cut.index(source.len() + 1));
        source
    }

    proptest! {
        #[test]
        fn prop_symbol_line_ranges_are_valid(
            which in 0..SAMPLES.len(),
            at in any::<prop::sample::Index>(),
            insert in "[ -~\n\t]{0,40}",
            cut in any::<prop::sample::Index>(),
        ) {
            let (path, sample) = SAMPLES[which];
            let source = mutate(sample, at, &insert, cut);
            let lines = source.lines().count().max(1);

            let analysis = ParserRegistry::new().analyze(path, &source);
            prop_assert!(analysis.is_ok(), "{}: {:?}", path, analysis.error);
            for symbol in &analysis.symbols {
                prop_assert!(symbol.line_start >= 1, "{:?}", symbol);
                prop_assert!(symbol.line_start <= symbol.line_end, "{:?}", symbol);
                prop_assert!(symbol.line_end <= lines + 1, "{:?} in {} lines", symbol, lines);
                prop_assert_eq!(&symbol.file_path, path);
            }
            for rel in &analysis.relationships {
                prop_assert!(rel.source_line >= 1, "{:?}", rel);
            }
        }

        #[test]
        fn prop_arbitrary_text_never_panics(which in 0..SAMPLES.len(), source in "\\PC{0,200}") {
            let (path, _) = SAMPLES[which];
            let analysis = ParserRegistry::new().analyze(path, &source);
            prop_assert!(analysis.is_ok());
            for symbol in &analysis.symbols {
                prop_assert!(symbol.line_start >= 1 && symbol.line_start <= symbol.line_end);
            }
        }
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension(".py"), Some(Language::Python));
        assert_eq!(Language::from_extension("TSX"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("mjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension(".xyz"), None);
        assert_eq!("Go".parse::<Language>().unwrap(), Language::Go);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_unsupported_file_fails_closed() {
        let registry = ParserRegistry::new();
        let analysis = registry.analyze("notes.xyz", "whatever");
        assert_eq!(analysis.error.as_deref(), Some("unsupported file type: .xyz"));
        assert!(analysis.symbols.is_empty());
        assert!(analysis.relationships.is_empty());
    }

    #[test]
    fn test_disabled_language_is_unsupported() {
        let registry = ParserRegistry::with_languages(&[Language::Python]);
        assert!(registry.supports("a.py"));
        assert!(!registry.supports("a.rs"));
        assert!(registry.analyze("a.rs", "fn main() {}").error.is_some());
        assert_eq!(registry.supported_languages(), vec![Language::Python]);
    }

    #[test]
    fn test_malformed_source_is_best_effort() {
        let registry = ParserRegistry::new();
        let analysis = registry.analyze("broken.py", "def f(:\n    g(\n\ndef h():\n    pass\n");
        assert!(analysis.is_ok());
        assert!(analysis.has_syntax_errors);
        for symbol in &analysis.symbols {
            assert!(symbol.line_start <= symbol.line_end);
        }
    }

    #[test]
    fn test_every_language_parses_empty_source() {
        let registry = ParserRegistry::new();
        for (path, lang) in [
            ("a.py", Language::Python),
            ("a.js", Language::JavaScript),
            ("a.ts", Language::TypeScript),
            ("a.tsx", Language::Tsx),
            ("a.rs", Language::Rust),
            ("a.go", Language::Go),
            ("A.java", Language::Java),
        ] {
            let analysis = registry.analyze(path, "");
            assert!(analysis.is_ok(), "{} failed: {:?}", path, analysis.error);
            assert_eq!(analysis.language, Some(lang));
            assert!(analysis.symbols.is_empty());
        }
    }

    #[test]
    fn test_scope_stack_discipline() {
        let module = Scope::default();
        let class = module.in_class("Job");
        let method = class.in_function("run");
        assert_eq!(method.function, Some("run"));
        assert_eq!(method.class, None);
        assert_eq!(class.function, None);
        assert_eq!(module.class, None);
    }

    #[test]
    fn test_add_call_requires_function_scope() {
        let mut analysis = FileAnalysis::new("a.py", Language::Python);
        analysis.add_call(Scope::default(), "print", 1);
        assert!(analysis.relationships.is_empty());

        analysis.add_call(Scope::default().in_function("f"), "g", 2);
        assert_eq!(analysis.relationships.len(), 1);
        assert_eq!(analysis.relationships[0].source_symbol, "f");
        analysis.push_symbol(Symbol::new("f", SymbolKind::Function, "a.py", 1, 2));
        assert_eq!(analysis.symbols.len(), 1);
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(resolve_relative_path("src/app.js", "./util"), Some("src/util".to_string()));
        assert_eq!(resolve_relative_path("src/a/b.js", "../c"), Some("src/c".to_string()));
        assert_eq!(resolve_relative_path("a.js", "../../x"), None);
        assert_eq!(resolve_relative_path("a.js", "react"), None);
    }

    #[test]
    fn test_resolve_python_module() {
        assert_eq!(resolve_python_module("pkg/a.py", ".util"), Some("pkg/util.py".to_string()));
        assert_eq!(resolve_python_module("pkg/sub/a.py", "..core.db"), Some("pkg/core/db.py".to_string()));
        assert_eq!(resolve_python_module("pkg/a.py", "."), Some("pkg/__init__.py".to_string()));
        assert_eq!(resolve_python_module("a.py", "os"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"fmt\""), "fmt");
        assert_eq!(unquote("'./x'"), "./x");
        assert_eq!(unquote("plain"), "plain");
    }
}
