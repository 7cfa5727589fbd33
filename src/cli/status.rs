use anyhow::Result;

use repograph::index::db::IndexDatabase;
use repograph::indexer::{status_report, StatusReport};

use super::{load_project, print_json};

pub async fn show_status(project: String, detailed: bool, format: String) -> Result<()> {
    let (root, config) = load_project(&project)?;
    let db_path = config.db_path(&root);
    if !db_path.exists() {
        println!("No index at {}. Run `repograph index` first.", db_path.display());
        return Ok(());
    }

    let db = IndexDatabase::new(&db_path)?;
    let stats = db.get_stats()?;
    let report = status_report(&db, !detailed)?;

    if format == "json" {
        return print_json(&serde_json::json!({ "stats": stats, "status": report }));
    }

    println!("Project: {}", root.display());
    println!("Database: {} ({:.2} MB)", db_path.display(), db_size_mb(&db_path));
    println!("\nIndex Statistics:");
    println!("  Files: {} ({} completed, {} failed)", stats.total_files, stats.completed_files, stats.failed_files);
    println!("  Symbols: {}", stats.total_symbols);
    println!("  Relationships: {}", stats.total_relationships);
    println!("  Chunks: {}", stats.total_chunks);
    println!("  Summaries: {}", stats.total_summaries);

    match report {
        StatusReport::Compact { by_status, .. } => {
            println!("\nBy status:");
            for (status, count) in by_status {
                println!("  {}: {}", status, count);
            }
        }
        StatusReport::Detailed { files, .. } => {
            println!("\nFiles:");
            for file in files {
                match file.error {
                    Some(error) => println!("  {} [{}] {}", file.path, file.status, error),
                    None => println!("  {} [{}] {} chunks", file.path, file.status, file.chunks),
                }
            }
        }
    }
    Ok(())
}

fn db_size_mb(db_path: &std::path::Path) -> f64 {
    std::fs::metadata(db_path)
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}
