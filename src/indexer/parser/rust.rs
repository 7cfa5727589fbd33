// Rust extraction

use tree_sitter::{Node, Tree};

use super::{doc_comment, end_line, field_text, node_text, start_line, Extractor, FileAnalysis, Language, Scope};
use crate::index::{Symbol, SymbolKind};

/// Rust extractor using tree-sitter
pub struct RustExtractor;

impl RustExtractor {
    pub fn new() -> Self {
        Self
    }

    fn visit<'a>(&self, node: Node<'_>, src: &'a str, scope: Scope<'a>, out: &mut FileAnalysis) {
        match node.kind() {
            "function_item" | "function_signature_item" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.extract_function(node, name, src, scope, out);
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "struct_item" | "enum_item" | "union_item" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.push_type(node, name, src, out);
                }
            }
            "trait_item" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.push_type(node, name, src, out);
                    if let Some(bounds) = node.child_by_field_name("bounds") {
                        let mut cursor = bounds.walk();
                        for bound in bounds.named_children(&mut cursor) {
                            if bound.kind() == "type_identifier" {
                                out.add_inherits(name, node_text(bound, src), start_line(node));
                            }
                        }
                    }
                    self.visit_children(node, src, scope.in_class(name), out);
                    return;
                }
            }
            "impl_item" => {
                if let Some(type_name) = node.child_by_field_name("type").and_then(|t| base_type_name(t, src)) {
                    // `impl Display for Foo` reads as Foo inheriting Display
                    if let Some(trait_node) = node.child_by_field_name("trait") {
                        if trait_node.kind() == "type_identifier" {
                            out.add_inherits(type_name, node_text(trait_node, src), start_line(node));
                        }
                    }
                    self.visit_children(node, src, scope.in_class(type_name), out);
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
            "use_declaration" => {
                if let Some(path) = field_text(node, "argument", src) {
                    let local = ["crate", "self", "super"]
                        .iter()
                        .any(|root| path == *root || path.starts_with(&format!("{}::", root)));
                    out.add_import(path, start_line(node), !local, None);
                }
                return;
            }
            "const_item" | "static_item" if scope.function.is_none() && scope.class.is_none() => {
                if let Some(name) = field_text(node, "name", src) {
                    out.push_symbol(
                        Symbol::new(name, SymbolKind::Variable, &out.file_path, start_line(node), end_line(node))
                            .with_docstring(doc_comment(node, src, "///"))
                            .exported(is_pub(node)),
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

    fn extract_function(&self, node: Node<'_>, name: &str, src: &str, scope: Scope<'_>, out: &mut FileAnalysis) {
        let kind = if scope.class.is_some() { SymbolKind::Method } else { SymbolKind::Function };

        out.push_symbol(
            Symbol::new(name, kind, &out.file_path, start_line(node), end_line(node))
                .with_signature(field_text(node, "parameters", src).map(str::to_string))
                .with_docstring(doc_comment(node, src, "///"))
                .with_parent(scope.class)
                .exported(is_pub(node)),
        );
    }

    fn push_type(&self, node: Node<'_>, name: &str, src: &str, out: &mut FileAnalysis) {
        out.push_symbol(
            Symbol::new(name, SymbolKind::Class, &out.file_path, start_line(node), end_line(node))
                .with_docstring(doc_comment(node, src, "///"))
                .exported(is_pub(node)),
        );
    }
}

impl Default for RustExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for RustExtractor {
    fn analyze(&self, file_path: &str, tree: &Tree, content: &str) -> FileAnalysis {
        let mut out = FileAnalysis::new(file_path, Language::Rust);
        self.visit(tree.root_node(), content, Scope::default(), &mut out);
        out
    }
}

fn is_pub(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| child.kind() == "visibility_modifier");
    found
}

/// `Foo`, `Foo<T>` and `a::Foo` all name `Foo`
fn base_type_name<'a>(node: Node<'_>, src: &'a str) -> Option<&'a str> {
    match node.kind() {
        "type_identifier" => Some(node_text(node, src)),
        "generic_type" => node.child_by_field_name("type").and_then(|t| base_type_name(t, src)),
        "scoped_type_identifier" => field_text(node, "name", src),
        _ => None,
    }
}

fn call_target<'a>(function: Node<'_>, src: &'a str) -> Option<&'a str> {
    match function.kind() {
        "identifier" => Some(node_text(function, src)),
        "field_expression" => field_text(function, "field", src),
        "scoped_identifier" => field_text(function, "name", src),
        "generic_function" => function
            .child_by_field_name("function")
            .and_then(|f| call_target(f, src)),
        _ => None,
    }
}
