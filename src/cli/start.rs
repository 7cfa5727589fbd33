use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use repograph::indexer::worker::IndexWorker;
use repograph::indexer::Indexer;

use super::{load_project, print_report};

/// Run the scheduler until Ctrl-C: a full cycle now, incremental cycles after
pub async fn start_worker(project: String, rebuild: bool) -> Result<()> {
    let (root, config) = load_project(&project)?;
    let indexer = Indexer::from_config(&root, &config)?;

    println!("repograph v{}", env!("CARGO_PKG_VERSION"));
    println!("Project: {}", root.display());
    println!("Database: {}", indexer.db().db_path().display());
    println!("Interval: {}s", config.indexing.interval_secs);

    if rebuild {
        info!("Rebuilding index from scratch");
        indexer.db().reset()?;
    }

    let worker = Arc::new(IndexWorker::new(Arc::new(indexer), config));
    let mut reports = worker.subscribe();
    worker.start();
    println!("Indexing. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report {
                    print_report(&report);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                break;
            }
        }
    }

    worker.stop().await;
    Ok(())
}
