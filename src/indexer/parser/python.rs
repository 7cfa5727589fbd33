// Python extraction

use tree_sitter::{Node, Tree};

use super::{
    end_line, field_text, node_text, resolve_python_module, start_line, Extractor, FileAnalysis,
    Language, Scope,
};
use crate::index::{Symbol, SymbolKind};

/// Python extractor using tree-sitter
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }

    fn visit<'a>(&self, node: Node<'_>, src: &'a str, scope: Scope<'a>, out: &mut FileAnalysis) {
        match node.kind() {
            "function_definition" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.extract_function(node, name, src, scope, out);
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "class_definition" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.extract_class(node, name, src, out);
                    self.visit_children(node, src, scope.in_class(name), out);
                    return;
                }
            }
            "call" => {
                if let Some(target) = node
                    .child_by_field_name("function")
                    .and_then(|f| call_target(f, src))
                {
                    out.add_call(scope, target, start_line(node));
                }
            }
            "import_statement" => {
                self.extract_import(node, src, out);
                return;
            }
            "import_from_statement" => {
                self.extract_import_from(node, src, out);
                return;
            }
            "expression_statement" if scope.class.is_none() && scope.function.is_none() => {
                self.extract_variable(node, src, out);
            }
            _ => {}
        }

        self.visit_children(node, src, scope, out);
    }

    fn visit_children<'a>(&self, node: Node<'_>, src: &'a str, scope: Scope<'a>, out: &mut FileAnalysis) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, src, scope, out);
        }
    }

    fn extract_function(&self, node: Node<'_>, name: &str, src: &str, scope: Scope<'_>, out: &mut FileAnalysis) {
        let kind = if scope.class.is_some() { SymbolKind::Method } else { SymbolKind::Function };

        out.push_symbol(
            Symbol::new(name, kind, &out.file_path, start_line(node), end_line(node))
                .with_signature(field_text(node, "parameters", src).map(str::to_string))
                .with_docstring(docstring(node, src))
                .with_parent(scope.class)
                .exported(is_public(name)),
        );
    }

    fn extract_class(&self, node: Node<'_>, name: &str, src: &str, out: &mut FileAnalysis) {
        out.push_symbol(
            Symbol::new(name, SymbolKind::Class, &out.file_path, start_line(node), end_line(node))
                .with_docstring(docstring(node, src))
                .exported(is_public(name)),
        );

        // Only identifier bases; `Generic[T]`, `mod.Base` and keyword args are skipped
        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.named_children(&mut cursor) {
                if base.kind() == "identifier" {
                    out.add_inherits(name, node_text(base, src), start_line(node));
                }
            }
        }
    }

    fn extract_import(&self, node: Node<'_>, src: &str, out: &mut FileAnalysis) {
        let line = start_line(node);
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            let module = match child.kind() {
                "aliased_import" => field_text(child, "name", src),
                _ => Some(node_text(child, src)).filter(|t| !t.is_empty()),
            };
            if let Some(module) = module {
                out.add_import(module, line, true, None);
            }
        }
    }

    fn extract_import_from(&self, node: Node<'_>, src: &str, out: &mut FileAnalysis) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        let module = node_text(module_node, src);
        if module.is_empty() {
            return;
        }

        if module_node.kind() == "relative_import" {
            let target = resolve_python_module(&out.file_path, module);
            out.add_import(module, start_line(node), false, target);
        } else {
            out.add_import(module, start_line(node), true, None);
        }
    }

    fn extract_variable(&self, node: Node<'_>, src: &str, out: &mut FileAnalysis) {
        let Some(assignment) = node.named_child(0).filter(|n| n.kind() == "assignment") else {
            return;
        };
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }

        let name = node_text(left, src);
        out.push_symbol(
            Symbol::new(name, SymbolKind::Variable, &out.file_path, start_line(node), end_line(node))
                .exported(is_public(name)),
        );
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for PythonExtractor {
    fn analyze(&self, file_path: &str, tree: &Tree, content: &str) -> FileAnalysis {
        let mut out = FileAnalysis::new(file_path, Language::Python);
        self.visit(tree.root_node(), content, Scope::default(), &mut out);
        out
    }
}

/// `f()` yields `f`; `a.b.c()` yields `c`
fn call_target<'a>(function: Node<'_>, src: &'a str) -> Option<&'a str> {
    match function.kind() {
        "identifier" => Some(node_text(function, src)),
        "attribute" => field_text(function, "attribute", src),
        _ => None,
    }
}

/// First statement of the body when it is a bare string literal
fn docstring(node: Node<'_>, src: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0).filter(|n| n.kind() == "string")?;

    let text = node_text(literal, src)
        .trim()
        .trim_start_matches(|c: char| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B'));
    let stripped = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| text.strip_prefix(q).and_then(|t| t.strip_suffix(q)))
        .unwrap_or(text)
        .trim();

    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_') || (name.starts_with("__") && name.ends_with("__"))
}

#[cfg(test)]
mod tests {
    use super::super::ParserRegistry;
    use super::*;
    use crate::index::RelationshipKind;

    fn analyze(src: &str) -> FileAnalysis {
        ParserRegistry::with_languages(&[Language::Python]).analyze("pkg/a.py", src)
    }

    #[test]
    fn test_call_between_functions() {
        let analysis = analyze("def f():\n    g()\n\ndef g():\n    pass\n");

        let names: Vec<_> = analysis.symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(names, vec![("f", SymbolKind::Function), ("g", SymbolKind::Function)]);

        let calls: Vec<_> = analysis
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Calls)
            .collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source_symbol, "f");
        assert_eq!(calls[0].target_symbol, "g");
        assert_eq!(calls[0].source_line, 2);
    }

    #[test]
    fn test_import_externality() {
        let analysis = analyze("import os\nfrom .util import helper\n");

        let imports: Vec<_> = analysis
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Imports)
            .collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].target_symbol, "os");
        assert!(imports[0].is_external);
        assert_eq!(imports[1].target_symbol, ".util");
        assert!(!imports[1].is_external);
        assert_eq!(imports[1].target_file.as_deref(), Some("pkg/util.py"));
        assert_eq!(analysis.imports, vec!["os", ".util"]);
    }

    #[test]
    fn test_aliased_and_dotted_imports() {
        let analysis = analyze("import numpy as np, os.path\nfrom collections import OrderedDict\n");
        assert_eq!(analysis.imports, vec!["numpy", "os.path", "collections"]);
        assert!(analysis.relationships.iter().all(|r| r.is_external));
    }

    #[test]
    fn test_inheritance_skips_non_identifier_bases() {
        let analysis = analyze("class A:\n    pass\n\nclass B(A, Generic[T], mod.Base):\n    pass\n");

        let inherits: Vec<_> = analysis
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Inherits)
            .collect();
        assert_eq!(inherits.len(), 1);
        assert_eq!(inherits[0].source_symbol, "B");
        assert_eq!(inherits[0].target_symbol, "A");
    }

    #[test]
    fn test_methods_nested_functions_and_docstrings() {
        let src = r#"
class Job:
    """Background job."""

    def run(self, force=False):
        """Run it."""
        self.prepare()

        def helper():
            log()
        helper()
"#;
        let analysis = analyze(src);

        let job = analysis.symbols.iter().find(|s| s.name == "Job").unwrap();
        assert_eq!(job.docstring.as_deref(), Some("Background job."));

        let run = analysis.symbols.iter().find(|s| s.name == "run").unwrap();
        assert_eq!(run.kind, SymbolKind::Method);
        assert_eq!(run.parent_symbol.as_deref(), Some("Job"));
        assert_eq!(run.signature.as_deref(), Some("(self, force=False)"));
        assert_eq!(run.docstring.as_deref(), Some("Run it."));

        let helper = analysis.symbols.iter().find(|s| s.name == "helper").unwrap();
        assert_eq!(helper.kind, SymbolKind::Function);
        assert!(helper.parent_symbol.is_none());

        let calls: Vec<_> = analysis
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Calls)
            .map(|r| (r.source_symbol.as_str(), r.target_symbol.as_str()))
            .collect();
        assert_eq!(calls, vec![("run", "prepare"), ("helper", "log"), ("run", "helper")]);
    }

    #[test]
    fn test_module_level_calls_are_not_attributed() {
        let analysis = analyze("print('hi')\nmain()\n");
        assert!(analysis.relationships.is_empty());
    }

    #[test]
    fn test_repeated_calls_are_kept() {
        let analysis = analyze("def f():\n    g(); g()\n");
        let calls = analysis
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Calls)
            .count();
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_module_variables_and_export_flag() {
        let analysis = analyze("VERSION = '1.0'\n_cache = {}\n\ndef _private():\n    pass\n\ndef __init__():\n    pass\n");

        let version = analysis.symbols.iter().find(|s| s.name == "VERSION").unwrap();
        assert_eq!(version.kind, SymbolKind::Variable);
        assert!(version.is_exported);
        assert!(!analysis.symbols.iter().find(|s| s.name == "_cache").unwrap().is_exported);
        assert!(!analysis.symbols.iter().find(|s| s.name == "_private").unwrap().is_exported);
        assert!(analysis.symbols.iter().find(|s| s.name == "__init__").unwrap().is_exported);
    }

    #[test]
    fn test_decorated_function_lines() {
        let analysis = analyze("@cached\ndef f(x):\n    return x\n");
        let f = analysis.symbols.iter().find(|s| s.name == "f").unwrap();
        assert_eq!((f.line_start, f.line_end), (2, 3));
    }
}
