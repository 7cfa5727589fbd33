// JavaScript / TypeScript / TSX extraction (one walker, three grammars)

use tree_sitter::{Node, Tree};

use super::{
    end_line, field_text, node_text, resolve_relative_path, start_line, unquote, Extractor,
    FileAnalysis, Language, Scope,
};
use crate::index::{Symbol, SymbolKind};

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// JavaScript-family extractor; `language` picks the grammar tag only
pub struct JavaScriptExtractor {
    language: Language,
}

impl JavaScriptExtractor {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn visit<'a>(&self, node: Node<'_>, src: &'a str, scope: Scope<'a>, out: &mut FileAnalysis) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.push_callable(node, node, name, SymbolKind::Function, src, scope, out);
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "variable_declarator" => {
                if let Some(name) = self.extract_declarator(node, src, scope, out) {
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "class_declaration" | "abstract_class_declaration" | "class" | "interface_declaration" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.extract_class(node, name, src, out);
                    self.visit_children(node, src, scope.in_class(name), out);
                    return;
                }
            }
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                if let Some(name) = field_text(node, "name", src) {
                    self.push_callable(node, node, name, SymbolKind::Method, src, scope, out);
                    self.visit_children(node, src, scope.in_function(name), out);
                    return;
                }
            }
            "field_definition" | "public_field_definition" => {
                let name = field_text(node, "property", src).or_else(|| field_text(node, "name", src));
                let value = node.child_by_field_name("value");
                if let (Some(name), Some(value)) = (name, value) {
                    if FUNCTION_VALUES.contains(&value.kind()) {
                        self.push_callable(node, value, name, SymbolKind::Method, src, scope, out);
                        self.visit_children(node, src, scope.in_function(name), out);
                        return;
                    }
                }
            }
            "call_expression" => self.extract_call(node, src, scope, out),
            "import_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.push_import(unquote(node_text(source, src)), start_line(node), out);
                }
                return;
            }
            "export_statement" => {
                // `export { x } from './y'` re-exports count as imports
                if let Some(source) = node.child_by_field_name("source") {
                    self.push_import(unquote(node_text(source, src)), start_line(node), out);
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

    /// Emit a function or method; `params_from` is the node holding the
    /// parameter list (the arrow function for `x = () => …` bindings).
    #[allow(clippy::too_many_arguments)]
    fn push_callable(
        &self,
        node: Node<'_>,
        params_from: Node<'_>,
        name: &str,
        kind: SymbolKind,
        src: &str,
        scope: Scope<'_>,
        out: &mut FileAnalysis,
    ) {
        let kind = if kind == SymbolKind::Method && scope.class.is_none() {
            SymbolKind::Function
        } else {
            kind
        };
        let parent = if kind == SymbolKind::Method { scope.class } else { None };
        let signature = field_text(params_from, "parameters", src)
            .or_else(|| field_text(params_from, "parameter", src))
            .map(str::to_string);

        out.push_symbol(
            Symbol::new(name, kind, &out.file_path, start_line(node), end_line(node))
                .with_signature(signature)
                .with_parent(parent)
                .exported(!name.starts_with('#')),
        );
    }

    /// `const f = () => …` becomes a function and returns its name so the
    /// body is visited in that scope. Other top-level bindings become variables.
    fn extract_declarator<'a>(
        &self,
        node: Node<'_>,
        src: &'a str,
        scope: Scope<'a>,
        out: &mut FileAnalysis,
    ) -> Option<&'a str> {
        let name_node = node.child_by_field_name("name")?;
        if name_node.kind() != "identifier" {
            return None;
        }
        let name = node_text(name_node, src);

        match node.child_by_field_name("value") {
            Some(value) if FUNCTION_VALUES.contains(&value.kind()) => {
                self.push_callable(node, value, name, SymbolKind::Function, src, scope, out);
                Some(name)
            }
            _ => {
                if scope.class.is_none() && scope.function.is_none() {
                    out.push_symbol(Symbol::new(
                        name,
                        SymbolKind::Variable,
                        &out.file_path,
                        start_line(node),
                        end_line(node),
                    ));
                }
                None
            }
        }
    }

    fn extract_class(&self, node: Node<'_>, name: &str, src: &str, out: &mut FileAnalysis) {
        out.push_symbol(Symbol::new(
            name,
            SymbolKind::Class,
            &out.file_path,
            start_line(node),
            end_line(node),
        ));

        let line = start_line(node);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "class_heritage" | "extends_type_clause" => {
                    for base in heritage_bases(child, src) {
                        out.add_inherits(name, base, line);
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_call(&self, node: Node<'_>, src: &str, scope: Scope<'_>, out: &mut FileAnalysis) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        match function.kind() {
            "identifier" if node_text(function, src) == "require" => {
                let module = node
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0))
                    .filter(|arg| arg.kind() == "string")
                    .map(|arg| unquote(node_text(arg, src)));
                if let Some(module) = module {
                    self.push_import(module, start_line(node), out);
                }
            }
            "identifier" => out.add_call(scope, node_text(function, src), start_line(node)),
            "member_expression" => {
                if let Some(property) = field_text(function, "property", src) {
                    out.add_call(scope, property, start_line(node));
                }
            }
            _ => {}
        }
    }

    fn push_import(&self, specifier: &str, line: usize, out: &mut FileAnalysis) {
        if specifier.is_empty() {
            return;
        }
        let local = specifier.starts_with('.') || specifier.starts_with('/');
        let target = if local { resolve_relative_path(&out.file_path, specifier) } else { None };
        out.add_import(specifier, line, !local, target);
    }
}

impl Extractor for JavaScriptExtractor {
    fn analyze(&self, file_path: &str, tree: &Tree, content: &str) -> FileAnalysis {
        let mut out = FileAnalysis::new(file_path, self.language);
        self.visit(tree.root_node(), content, Scope::default(), &mut out);
        out
    }
}

/// Identifier-shaped bases of an `extends`/`implements` clause
fn heritage_bases<'a>(clause: Node<'_>, src: &'a str) -> Vec<&'a str> {
    let mut bases = Vec::new();
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" | "type_identifier" => bases.push(node_text(child, src)),
            "extends_clause" | "implements_clause" => {
                let mut inner = child.walk();
                for base in child.named_children(&mut inner) {
                    if matches!(base.kind(), "identifier" | "type_identifier") {
                        bases.push(node_text(base, src));
                    }
                }
            }
            _ => {}
        }
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::super::ParserRegistry;
    use super::*;
    use crate::index::RelationshipKind;

    fn analyze(path: &str, src: &str) -> FileAnalysis {
        ParserRegistry::new().analyze(path, src)
    }

    fn edges(analysis: &FileAnalysis, kind: RelationshipKind) -> Vec<(String, String)> {
        analysis
            .relationships
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| (r.source_symbol.clone(), r.target_symbol.clone()))
            .collect()
    }

    #[test]
    fn test_functions_and_calls() {
        let src = "function main() {\n  helper();\n  console.log('x');\n}\nconst helper = (a, b) => compute(a);\n";
        let analysis = analyze("src/app.js", src);

        let helper = analysis.symbols.iter().find(|s| s.name == "helper").unwrap();
        assert_eq!(helper.kind, SymbolKind::Function);
        assert_eq!(helper.signature.as_deref(), Some("(a, b)"));

        assert_eq!(
            edges(&analysis, RelationshipKind::Calls),
            vec![
                ("main".to_string(), "helper".to_string()),
                ("main".to_string(), "log".to_string()),
                ("helper".to_string(), "compute".to_string()),
            ]
        );
    }

    #[test]
    fn test_imports_and_require() {
        let src = "import React from 'react';\nimport { a } from './util';\nexport { b } from '../shared/b';\nconst fs = require('fs');\n";
        let analysis = analyze("src/app.js", src);

        assert_eq!(analysis.imports, vec!["react", "./util", "../shared/b", "fs"]);
        let imports: Vec<_> = analysis
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Imports)
            .collect();
        assert!(imports[0].is_external);
        assert!(!imports[1].is_external);
        assert_eq!(imports[1].target_file.as_deref(), Some("src/util"));
        assert_eq!(imports[2].target_file.as_deref(), Some("shared/b"));
        assert!(imports[3].is_external);
        assert!(edges(&analysis, RelationshipKind::Calls).is_empty());

        let fs = analysis.symbols.iter().find(|s| s.name == "fs").unwrap();
        assert_eq!(fs.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_class_members() {
        let src = "class Dog extends Animal {\n  bark() { this.speak(); }\n  onClick = () => { run(); };\n}\n";
        let analysis = analyze("dog.js", src);

        assert_eq!(
            edges(&analysis, RelationshipKind::Inherits),
            vec![("Dog".to_string(), "Animal".to_string())]
        );
        let bark = analysis.symbols.iter().find(|s| s.name == "bark").unwrap();
        assert_eq!(bark.kind, SymbolKind::Method);
        assert_eq!(bark.parent_symbol.as_deref(), Some("Dog"));
        let on_click = analysis.symbols.iter().find(|s| s.name == "onClick").unwrap();
        assert_eq!(on_click.kind, SymbolKind::Method);

        let calls = edges(&analysis, RelationshipKind::Calls);
        assert!(calls.contains(&("bark".to_string(), "speak".to_string())));
        assert!(calls.contains(&("onClick".to_string(), "run".to_string())));
    }

    #[test]
    fn test_typescript_heritage() {
        let src = "interface Shape extends Named { area(): number; }\nabstract class Base {}\nclass Square extends Base implements Shape, Printable<T> {\n  area(): number { return side(); }\n}\n";
        let analysis = analyze("shapes.ts", src);
        assert_eq!(analysis.language, Some(Language::TypeScript));

        let inherits = edges(&analysis, RelationshipKind::Inherits);
        assert!(inherits.contains(&("Shape".to_string(), "Named".to_string())));
        assert!(inherits.contains(&("Square".to_string(), "Base".to_string())));
        assert!(inherits.contains(&("Square".to_string(), "Shape".to_string())));
        assert!(!inherits.iter().any(|(_, base)| base.starts_with("Printable")));

        let kinds: Vec<_> = analysis
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Class)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(kinds, vec!["Shape", "Base", "Square"]);
    }

    #[test]
    fn test_tsx_component() {
        let src = "export function App() {\n  return <div onClick={() => track()}>hi</div>;\n}\n";
        let analysis = analyze("App.tsx", src);
        assert_eq!(analysis.language, Some(Language::Tsx));
        assert!(analysis.symbols.iter().any(|s| s.name == "App"));
        assert_eq!(
            edges(&analysis, RelationshipKind::Calls),
            vec![("App".to_string(), "track".to_string())]
        );
    }

    #[test]
    fn test_top_level_calls_not_attributed() {
        let analysis = analyze("index.js", "init();\napp.listen(3000);\n");
        assert!(edges(&analysis, RelationshipKind::Calls).is_empty());
    }
}
