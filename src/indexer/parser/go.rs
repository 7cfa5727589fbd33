// Go extraction

use tree_sitter::{Node, Tree};

use super::{
    doc_comment, end_line, field_text, node_text, resolve_relative_path, start_line, unquote, Extractor,
    FileAnalysis, Language, Scope,
};
use crate::index::{Symbol, SymbolKind};

/// Go extractor using tree-sitter
pub struct GoExtractor;

impl GoExtractor {
    pub fn new() -> Self {
        Self
    }

    fn visit<'a>(&self, node: Node<'_>, src: &'a str, scope: Scope<'a>, out: &mut FileAnalysis) {
        match node.kind() {
            "function_declaration" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.push_callable(node, name, SymbolKind::Function, None, src, out);
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "method_declaration" => {
                if let Some(name) = field_text(node, "name", src) {
                    let receiver = node
                        .child_by_field_name("receiver")
                        .and_then(|r| receiver_type(r, src));
                    self.push_callable(node, name, SymbolKind::Method, receiver, src, out);
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "method_elem" | "method_spec" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.push_callable(node, name, SymbolKind::Method, scope.class, src, out);
                }
                return;
            }
            "type_spec" => {
                if let Some(name) = self.extract_type(node, src, out) {
                    self.visit_children(node, src, scope.in_class(name), out);
                    return;
                }
            }
            "call_expression" => {
                if let Some(target) = node
                    .child_by_field_name("function")
                    .and_then(|f| call_target(f, src))
                {
                    out.add_call(scope, target, start_line(node));
                }
            }
            "import_spec" => {
                if let Some(path) = field_text(node, "path", src).map(unquote) {
                    let local = path.starts_with('.');
                    let target = if local { resolve_relative_path(&out.file_path, path) } else { None };
                    out.add_import(path, start_line(node), !local, target);
                }
                return;
            }
            "var_spec" | "const_spec" if scope.function.is_none() && scope.class.is_none() => {
                let mut cursor = node.walk();
                for ident in node.children_by_field_name("name", &mut cursor) {
                    let name = node_text(ident, src);
                    if name == "_" {
                        continue;
                    }
                    out.push_symbol(
                        Symbol::new(name, SymbolKind::Variable, &out.file_path, start_line(node), end_line(node))
                            .exported(is_exported(name)),
                    );
                }
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

    fn push_callable(
        &self,
        node: Node<'_>,
        name: &str,
        kind: SymbolKind,
        parent: Option<&str>,
        src: &str,
        out: &mut FileAnalysis,
    ) {
        // Doc comments attach to the declaration, not to specs inside it
        let documented = match node.kind() {
            "method_elem" | "method_spec" => None,
            _ => doc_comment(node, src, "//"),
        };

        out.push_symbol(
            Symbol::new(name, kind, &out.file_path, start_line(node), end_line(node))
                .with_signature(field_text(node, "parameters", src).map(str::to_string))
                .with_docstring(documented)
                .with_parent(parent)
                .exported(is_exported(name)),
        );
    }

    /// Struct and interface type specs become classes; embedded types
    /// become inheritance edges. Returns the name for scoping.
    fn extract_type<'a>(&self, node: Node<'_>, src: &'a str, out: &mut FileAnalysis) -> Option<&'a str> {
        let name = field_text(node, "name", src)?;
        let body = node.child_by_field_name("type")?;
        if !matches!(body.kind(), "struct_type" | "interface_type") {
            return None;
        }

        let declaration = node.parent().filter(|p| p.kind() == "type_declaration").unwrap_or(node);
        out.push_symbol(
            Symbol::new(name, SymbolKind::Class, &out.file_path, start_line(node), end_line(node))
                .with_docstring(doc_comment(declaration, src, "//"))
                .exported(is_exported(name)),
        );

        for base in embedded_types(body, src) {
            out.add_inherits(name, base, start_line(node));
        }

        Some(name)
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for GoExtractor {
    fn analyze(&self, file_path: &str, tree: &Tree, content: &str) -> FileAnalysis {
        let mut out = FileAnalysis::new(file_path, Language::Go);
        self.visit(tree.root_node(), content, Scope::default(), &mut out);
        out
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// `(s *Server)` and `(s Server[T])` both name `Server`
fn receiver_type<'a>(receiver: Node<'_>, src: &'a str) -> Option<&'a str> {
    let mut cursor = receiver.walk();
    let param = receiver
        .named_children(&mut cursor)
        .find(|n| n.kind() == "parameter_declaration")?;
    let mut ty = param.child_by_field_name("type")?;
    loop {
        match ty.kind() {
            "type_identifier" => return Some(node_text(ty, src)),
            "pointer_type" => ty = ty.named_child(0)?,
            "generic_type" => ty = ty.child_by_field_name("type")?,
            _ => return None,
        }
    }
}

/// Identifier-shaped embedded fields of a struct, or embedded interfaces
fn embedded_types<'a>(body: Node<'_>, src: &'a str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        match child.kind() {
            "field_declaration_list" => {
                let mut fields = child.walk();
                for field in child.named_children(&mut fields) {
                    if field.kind() == "field_declaration" && field.child_by_field_name("name").is_none() {
                        if let Some(ty) = field.child_by_field_name("type").filter(|t| t.kind() == "type_identifier") {
                            found.push(node_text(ty, src));
                        }
                    }
                }
            }
            "type_elem" | "constraint_elem" | "interface_type_name" => {
                let mut terms = child.walk();
                for term in child.named_children(&mut terms) {
                    if term.kind() == "type_identifier" {
                        found.push(node_text(term, src));
                    }
                }
            }
            _ => {}
        }
    }
    found
}

fn call_target<'a>(function: Node<'_>, src: &'a str) -> Option<&'a str> {
    match function.kind() {
        "identifier" => Some(node_text(function, src)),
        "selector_expression" => field_text(function, "field", src),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::ParserRegistry;
    use super::*;
    use crate::index::RelationshipKind;

    fn analyze(src: &str) -> FileAnalysis {
        ParserRegistry::with_languages(&[Language::Go]).analyze("cmd/server/main.go", src)
    }

    #[test]
    fn test_go_declarations() {
        let src = r#"package main

import (
	"fmt"
	util "./util"
)

var Version = "1.0"

// Server handles requests.
type Server struct {
	Base
	name string
}

type Handler interface {
	Named
	Serve(req int) error
}

func (s *Server) Start(port int) {
	s.listen(port)
	fmt.Println("up")
}

func main() {
	NewServer().Start(8080)
}
"#;
        let analysis = analyze(src);

        let server = analysis.symbols.iter().find(|s| s.name == "Server").unwrap();
        assert_eq!(server.kind, SymbolKind::Class);
        assert_eq!(server.docstring.as_deref(), Some("Server handles requests."));

        let start = analysis.symbols.iter().find(|s| s.name == "Start").unwrap();
        assert_eq!(start.kind, SymbolKind::Method);
        assert_eq!(start.parent_symbol.as_deref(), Some("Server"));
        assert_eq!(start.signature.as_deref(), Some("(port int)"));

        let serve = analysis.symbols.iter().find(|s| s.name == "Serve").unwrap();
        assert_eq!(serve.parent_symbol.as_deref(), Some("Handler"));

        let version = analysis.symbols.iter().find(|s| s.name == "Version").unwrap();
        assert_eq!(version.kind, SymbolKind::Variable);
        assert!(version.is_exported);
        assert!(!analysis.symbols.iter().find(|s| s.name == "main").unwrap().is_exported);

        let edges: Vec<_> = analysis
            .relationships
            .iter()
            .map(|r| (r.kind, r.source_symbol.as_str(), r.target_symbol.as_str(), r.is_external))
            .collect();
        assert!(edges.contains(&(RelationshipKind::Imports, "__module__", "fmt", true)));
        assert!(edges.contains(&(RelationshipKind::Imports, "__module__", "./util", false)));
        assert!(edges.contains(&(RelationshipKind::Inherits, "Server", "Base", false)));
        assert!(edges.contains(&(RelationshipKind::Inherits, "Handler", "Named", false)));
        assert!(edges.contains(&(RelationshipKind::Calls, "Start", "listen", false)));
        assert!(edges.contains(&(RelationshipKind::Calls, "Start", "Println", false)));
        assert!(edges.contains(&(RelationshipKind::Calls, "main", "Start", false)));
        assert!(edges.contains(&(RelationshipKind::Calls, "main", "NewServer", false)));

        let util = analysis
            .relationships
            .iter()
            .find(|r| r.target_symbol == "./util")
            .unwrap();
        assert_eq!(util.target_file.as_deref(), Some("cmd/server/util"));
    }
}
