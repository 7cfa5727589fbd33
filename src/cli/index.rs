use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use repograph::indexer::worker::{CycleMode, IndexWorker};
use repograph::indexer::Indexer;

use super::{load_project, print_json, print_report};

/// Run a single indexing cycle and exit
pub async fn index_project(project: String, full: bool, rebuild: bool, format: String) -> Result<()> {
    let (root, config) = load_project(&project)?;
    let indexer = Indexer::from_config(&root, &config)?;

    if rebuild {
        info!("Rebuilding index from scratch");
        indexer.db().reset()?;
    }

    let mode = if full || rebuild { CycleMode::Full } else { CycleMode::Incremental };
    let worker = IndexWorker::new(Arc::new(indexer), config);
    let report = worker.run_cycle(mode).await?;

    if format == "json" {
        print_json(&report)?;
    } else {
        println!("Project: {}", root.display());
        print_report(&report);
    }

    if report.failed > 0 {
        info!("{} files failed; run `repograph status --detailed` for errors", report.failed);
    }
    Ok(())
}
