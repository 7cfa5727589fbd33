use anyhow::{bail, Result};

use repograph::index::db::IndexDatabase;
use repograph::query::{Direction, QueryEngine};

use super::{load_project, print_json};

/// Open the query engine over an existing index
pub fn open_engine(project: &str) -> Result<QueryEngine> {
    let (root, config) = load_project(project)?;
    let db_path = config.db_path(&root);
    if !db_path.exists() {
        bail!("No index at {}. Run `repograph index` first.", db_path.display());
    }
    Ok(QueryEngine::new(IndexDatabase::new(&db_path)?))
}

pub async fn query_index(
    query_type: String,
    target: String,
    project: String,
    limit: usize,
    direction: String,
    format: String,
) -> Result<()> {
    let engine = open_engine(&project)?;
    let json = match format.as_str() {
        "json" => true,
        "text" => false,
        other => bail!("Unknown format: {}", other),
    };

    match query_type.as_str() {
        "callers" => {
            let rows = engine.find_callers(&target, limit)?;
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No callers of '{}'", target);
            }
            for row in rows {
                let external = if row.is_external { " (external)" } else { "" };
                println!("  {}:{} - {}{}", row.caller_file, row.caller_line, row.caller, external);
            }
        }
        "callees" => {
            let rows = engine.find_callees(&target, limit)?;
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No callees of '{}'", target);
            }
            for row in rows {
                println!("  {}:{} -> {} [{}]", row.caller_file, row.call_line, row.callee, row.resolution);
            }
        }
        "deps" => {
            let direction: Direction = direction.parse()?;
            let tree = engine.dependency_tree(&target, direction)?;
            if json {
                return print_json(&tree);
            }
            println!("{}", tree.file);
            println!("  imports ({}):", tree.imports.len());
            for import in &tree.imports {
                let resolved = match (&import.target_file, import.is_external) {
                    (_, true) => " (external)".to_string(),
                    (Some(file), false) => format!(" -> {}", file),
                    (None, false) => String::new(),
                };
                println!("    {}:{}{}", import.module, import.line, resolved);
            }
            println!("  imported by ({}):", tree.imported_by.len());
            for importer in &tree.imported_by {
                println!("    {}:{} ({})", importer.file, importer.line, importer.module);
            }
        }
        "file" => {
            let state = engine.is_indexed(&target)?;
            if json {
                return print_json(&state);
            }
            println!("{}: {}", target, state.status);
            if let Some(count) = state.unit_count {
                println!("  chunks: {}", count);
            }
            if let Some(at) = &state.indexed_at {
                println!("  indexed at: {}", at);
            }
            if let Some(error) = &state.error {
                println!("  error: {}", error);
            }
            if state.indexed {
                for symbol in engine.symbols_in_file(&target)? {
                    println!("  {} {} (line {})", symbol.kind, symbol.name, symbol.line_start);
                }
            }
        }
        other => bail!("Unknown query type: {} (expected callers, callees, deps or file)", other),
    }

    Ok(())
}
