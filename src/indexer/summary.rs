// File summaries

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const MAX_DOC_CHARS: usize = 200;
const MAX_IMPORTS: usize = 5;

/// Produces a short description of a file.
///
/// `load` and `unload` bracket a batch so an expensive model is loaded once
/// per cycle rather than once per file.
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Result<()>;

    fn summarize(&self, path: &str, content: &str, language: Option<&str>) -> Result<String>;

    fn unload(&self);
}

/// Rule-based summarizer: leading doc comment, definition counts, imports
#[derive(Debug, Default)]
pub struct SimpleSummarizer;

struct LanguageRules {
    functions: Regex,
    classes: Regex,
    imports: Regex,
}

static PYTHON: Lazy<Option<LanguageRules>> = Lazy::new(|| {
    rules(
        r"(?m)^\s*(?:async\s+)?def\s+\w+",
        r"(?m)^\s*class\s+\w+",
        r"(?m)^\s*(?:from\s+([\w.]+)\s+import|import\s+([\w.]+))",
    )
});

static JAVASCRIPT: Lazy<Option<LanguageRules>> = Lazy::new(|| {
    rules(
        r"\bfunction\b|=>",
        r"\bclass\s+\w+",
        r#"from\s+['"]([^'"]+)['"]|require\(\s*['"]([^'"]+)['"]"#,
    )
});

static RUST: Lazy<Option<LanguageRules>> = Lazy::new(|| {
    rules(
        r"\bfn\s+\w+",
        r"\b(?:struct|enum|trait|union)\s+\w+",
        r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;{]+)",
    )
});

static GO: Lazy<Option<LanguageRules>> = Lazy::new(|| {
    rules(
        r"(?m)^func\s",
        r"(?m)^\s*type\s+\w+\s+(?:struct|interface)\b",
        r#"(?m)^\s*(?:import\s+)?(?:[\w.]+\s+)?"([\w./-]+)"\s*$"#,
    )
});

static JAVA: Lazy<Option<LanguageRules>> = Lazy::new(|| {
    rules(
        r"(?m)^\s*(?:(?:public|private|protected|static|final|abstract|synchronized)\s+)+[\w<>\[\], ]+\s+\w+\s*\(",
        r"\b(?:class|interface|enum|record)\s+\w+",
        r"(?m)^\s*import\s+(?:static\s+)?([\w.*]+)\s*;",
    )
});

fn rules(functions: &str, classes: &str, imports: &str) -> Option<LanguageRules> {
    Some(LanguageRules {
        functions: Regex::new(functions).ok()?,
        classes: Regex::new(classes).ok()?,
        imports: Regex::new(imports).ok()?,
    })
}

fn rules_for(language: &str) -> Option<&'static LanguageRules> {
    let table: &'static Option<LanguageRules> = match language {
        "python" => &*PYTHON,
        "javascript" | "typescript" => &*JAVASCRIPT,
        "rust" => &*RUST,
        "go" => &*GO,
        "java" => &*JAVA,
        _ => return None,
    };
    table.as_ref()
}

impl SimpleSummarizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Summarizer for SimpleSummarizer {
    fn name(&self) -> &str {
        "simple"
    }

    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn summarize(&self, path: &str, content: &str, language: Option<&str>) -> Result<String> {
        let mut parts = Vec::new();

        if let Some(doc) = leading_doc(content) {
            parts.push(doc.trim_end_matches('.').to_string());
        }

        if let Some(rules) = language.and_then(rules_for) {
            let classes = rules.classes.find_iter(content).count();
            let functions = rules.functions.find_iter(content).count();
            if classes > 0 {
                parts.push(format!("Defines {} class(es)", classes));
            }
            if functions > 0 {
                parts.push(format!("Contains {} function(s)", functions));
            }

            let mut imports: Vec<&str> = Vec::new();
            for caps in rules.imports.captures_iter(content) {
                let module = caps.iter().skip(1).flatten().next().map(|m| m.as_str().trim());
                if let Some(module) = module {
                    if !module.is_empty() && !imports.contains(&module) {
                        imports.push(module);
                    }
                }
            }
            if !imports.is_empty() {
                imports.truncate(MAX_IMPORTS);
                parts.push(format!("Imports: {}", imports.join(", ")));
            }
        }

        let summary = if parts.is_empty() {
            match language {
                Some(lang) => format!("{} module", capitalize(lang)),
                None => "File".to_string(),
            }
        } else {
            parts.join(". ")
        };

        debug!("Summarized {}: {}", path, summary);
        Ok(summary)
    }

    fn unload(&self) {}
}

/// Module docstring or leading comment block, cut to `MAX_DOC_CHARS`
fn leading_doc(content: &str) -> Option<String> {
    let mut lines = content.lines().map(str::trim).skip_while(|l| l.is_empty() || l.starts_with("#!"));
    let first = lines.next()?;

    let mut collected: Vec<String> = Vec::new();
    if let Some(quote) = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q)) {
        let rest = &first[quote.len()..];
        if let Some(end) = rest.find(quote) {
            collected.push(rest[..end].to_string());
        } else {
            collected.push(rest.to_string());
            for line in lines.by_ref().take(20) {
                if let Some(end) = line.find(quote) {
                    collected.push(line[..end].to_string());
                    break;
                }
                collected.push(line.to_string());
            }
        }
    } else if ["//", "/*", "#"].iter().any(|p| first.starts_with(p)) {
        for line in std::iter::once(first).chain(lines.take_while(|l| {
            l.starts_with("//") || l.starts_with('*') || l.starts_with('#') || l.starts_with("/*")
        })) {
            let cleaned = line
                .trim_start_matches(['/', '*', '!', '#'])
                .trim_end_matches("*/")
                .trim();
            collected.push(cleaned.to_string());
        }
    } else {
        return None;
    }

    let joined = collected
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        return None;
    }
    Some(joined.chars().take(MAX_DOC_CHARS).collect())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
