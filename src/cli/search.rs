use anyhow::Result;

use super::print_json;
use super::query::open_engine;

/// Keyword search over chunks, or over symbol names with `--symbols`
pub async fn search_index(query: String, project: String, k: usize, symbols: bool, format: String) -> Result<()> {
    let engine = open_engine(&project)?;

    if symbols {
        let found = engine.search_symbols(&query, None, k)?;
        if format == "json" {
            return print_json(&found);
        }
        if found.is_empty() {
            println!("No symbols matching '{}'", query);
        }
        for symbol in found {
            println!("  {}:{} - {} ({})", symbol.file_path, symbol.line_start, symbol.name, symbol.kind);
        }
        return Ok(());
    }

    let hits = engine.search_chunks(&query, k)?;
    if format == "json" {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("No chunks matching '{}'", query);
    }
    for hit in hits {
        println!("{}:{}-{} (score {:.3})", hit.file_path, hit.start_line, hit.end_line, hit.score);
        for line in hit.content.lines().take(3) {
            println!("    {}", line);
        }
    }
    Ok(())
}
