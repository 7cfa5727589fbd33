// CLI command implementations

pub mod index;
pub mod languages;
pub mod query;
pub mod search;
pub mod start;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;

use repograph::config::Config;
use repograph::indexer::worker::CycleReport;

/// Repository root and configuration for a project directory
pub fn load_project(project: &str) -> Result<(PathBuf, Config)> {
    let project_dir = PathBuf::from(project);
    let config = Config::from_project_dir(&project_dir);
    let root = config.root_dir(&project_dir);
    let root = root
        .canonicalize()
        .with_context(|| format!("Project directory not found: {}", root.display()))?;
    Ok((root, config))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_report(report: &CycleReport) {
    println!(
        "{:?} cycle: {} indexed ({} unchanged), {} deleted, {} skipped, {} failed, {} summarized in {} ms{}",
        report.mode,
        report.indexed,
        report.unchanged,
        report.deleted,
        report.skipped,
        report.failed,
        report.summarized,
        report.duration_ms,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    if let Some(checkpoint) = &report.checkpoint_after {
        println!("Checkpoint: {}", checkpoint);
    }
}
