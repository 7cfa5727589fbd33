// Java extraction

use tree_sitter::{Node, Tree};

use super::{doc_comment, end_line, field_text, node_text, start_line, Extractor, FileAnalysis, Language, Scope};
use crate::index::{Symbol, SymbolKind};

/// Java extractor using tree-sitter
pub struct JavaExtractor;

impl JavaExtractor {
    pub fn new() -> Self {
        Self
    }

    fn visit<'a>(&self, node: Node<'_>, src: &'a str, scope: Scope<'a>, out: &mut FileAnalysis) {
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.extract_type(node, name, src, out);
                    self.visit_children(node, src, scope.in_class(name), out);
                    return;
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(name) = field_text(node, "name", src) {
                    let kind = if scope.class.is_some() { SymbolKind::Method } else { SymbolKind::Function };
                    out.push_symbol(
                        Symbol::new(name, kind, &out.file_path, start_line(node), end_line(node))
                            .with_signature(field_text(node, "parameters", src).map(str::to_string))
                            .with_docstring(doc_comment(node, src, "/**"))
                            .with_parent(scope.class)
                            .exported(is_public(node, src)),
                    );
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "method_invocation" => {
                if let Some(target) = field_text(node, "name", src) {
                    out.add_call(scope, target, start_line(node));
                }
            }
            "import_declaration" => {
                self.extract_import(node, src, out);
                return;
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

    fn extract_type(&self, node: Node<'_>, name: &str, src: &str, out: &mut FileAnalysis) {
        out.push_symbol(
            Symbol::new(name, SymbolKind::Class, &out.file_path, start_line(node), end_line(node))
                .with_docstring(doc_comment(node, src, "/**"))
                .exported(is_public(node, src)),
        );

        let line = start_line(node);
        for field in ["superclass", "interfaces"] {
            if let Some(clause) = node.child_by_field_name(field) {
                for base in identifier_types(clause, src) {
                    out.add_inherits(name, base, line);
                }
            }
        }

        // `interface A extends B, C` has no field name in the grammar
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "extends_interfaces" {
                for base in identifier_types(child, src) {
                    out.add_inherits(name, base, line);
                }
            }
        }
    }

    /// Java imports always name packages, so they are all external.
    fn extract_import(&self, node: Node<'_>, src: &str, out: &mut FileAnalysis) {
        let mut path = None;
        let mut wildcard = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "scoped_identifier" | "identifier" => path = Some(node_text(child, src)),
                "asterisk" => wildcard = true,
                _ => {}
            }
        }

        if let Some(path) = path {
            let specifier = if wildcard { format!("{}.*", path) } else { path.to_string() };
            out.add_import(&specifier, start_line(node), true, None);
        }
    }
}

impl Default for JavaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for JavaExtractor {
    fn analyze(&self, file_path: &str, tree: &Tree, content: &str) -> FileAnalysis {
        let mut out = FileAnalysis::new(file_path, Language::Java);
        self.visit(tree.root_node(), content, Scope::default(), &mut out);
        out
    }
}

fn is_public(node: Node<'_>, src: &str) -> bool {
    let mut cursor = node.walk();
    let public = node
        .children(&mut cursor)
        .filter(|child| child.kind() == "modifiers")
        .any(|modifiers| node_text(modifiers, src).split_whitespace().any(|m| m == "public"));
    public
}

/// `type_identifier`s of a superclass or type list, skipping generics
fn identifier_types<'a>(clause: Node<'_>, src: &'a str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "type_identifier" => found.push(node_text(child, src)),
            "type_list" => found.extend(identifier_types(child, src)),
            _ => {}
        }
    }
    found
}
