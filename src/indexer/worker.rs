// Interval scheduler: turns detected changes into indexing work

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::delta::{ChangeDetector, ChangeEvent, ChangeKind, ChangeSource};
use super::ignore::IgnoreFilter;
use super::{IndexOutcome, Indexer};
use crate::config::Config;

/// `index_meta` key holding the last fully processed checkpoint
pub const CHECKPOINT_KEY: &str = "last_checkpoint";

/// `index_meta` key holding the JSON list of paths that differed from the
/// checkpoint's tree when it was saved. They are revisited next cycle.
pub const DIRTY_PATHS_KEY: &str = "dirty_paths";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleMode {
    /// Walk the whole tree
    Full,
    /// Delta since the stored checkpoint, full walk if there is none
    Incremental,
}

/// Counts for one cycle. `indexed` includes files whose content was
/// unchanged; `unchanged` breaks those out.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub mode: CycleMode,
    pub indexed: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub summarized: usize,
    pub cancelled: bool,
    pub checkpoint_before: Option<String>,
    pub checkpoint_after: Option<String>,
    pub duration_ms: u64,
}

enum Task {
    Index(String),
    Delete(String),
}

enum FileResult {
    Indexed(String),
    Unchanged,
    Deleted { removed: bool },
    Failed,
    Cancelled,
}

/// Runs a full cycle at start, then incremental cycles every interval
/// until stopped. Cycles never overlap.
pub struct IndexWorker {
    indexer: Arc<Indexer>,
    config: Config,
    detector: ChangeDetector,
    ignore: Mutex<IgnoreFilter>,
    shutdown: watch::Sender<bool>,
    reports: watch::Sender<Option<CycleReport>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl IndexWorker {
    pub fn new(indexer: Arc<Indexer>, config: Config) -> Self {
        let root = indexer.root().to_path_buf();
        let (shutdown, _) = watch::channel(false);
        let (reports, _) = watch::channel(None);

        Self {
            detector: ChangeDetector::new(&root),
            ignore: Mutex::new(IgnoreFilter::load(&root)),
            indexer,
            config,
            shutdown,
            reports,
            handle: Mutex::new(None),
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    pub fn state(&self) -> WorkerState {
        match self.handle.lock().as_ref() {
            Some(handle) if !handle.is_finished() => WorkerState::Running,
            _ => WorkerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Receives the report of every finished cycle
    pub fn subscribe(&self) -> watch::Receiver<Option<CycleReport>> {
        self.reports.subscribe()
    }

    /// Eligible = allowed extension, no substring ignore match, not ignored
    /// by the repository rules.
    pub fn should_index(&self, path: &str) -> bool {
        let ignore = self.ignore.lock();
        self.is_eligible(&ignore, path)
    }

    fn is_eligible(&self, ignore: &IgnoreFilter, path: &str) -> bool {
        if !self.config.has_allowed_extension(path) {
            return false;
        }
        if self.config.matches_ignore_pattern(path) {
            debug!("Skipping {}: matches ignore pattern", path);
            return false;
        }
        if ignore.is_ignored(path) {
            debug!("Skipping {}: ignored by repository rules", path);
            return false;
        }
        true
    }

    /// Spawn the scheduling loop. Must be called inside a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("Index worker already running");
            return;
        }

        self.shutdown.send_replace(false);
        let shutdown = self.shutdown.subscribe();
        let worker = Arc::clone(self);
        *handle = Some(tokio::spawn(async move { worker.run_loop(shutdown).await }));
        info!("Index worker started for {}", self.indexer.root().display());
    }

    /// Cancel the loop and wait for it. A file already being indexed finishes.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Index worker task failed: {}", e);
            }
        }
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.indexing.interval_secs.max(1));
        let mut mode = CycleMode::Full;

        loop {
            match self.cycle(mode, &shutdown).await {
                Ok(report) => info!(
                    "Cycle done ({:?}): {} indexed, {} deleted, {} skipped, {} failed in {} ms",
                    report.mode, report.indexed, report.deleted, report.skipped, report.failed, report.duration_ms
                ),
                Err(e) => error!("Indexing cycle failed: {:#}", e),
            }

            if *shutdown.borrow() {
                break;
            }
            mode = CycleMode::Incremental;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Index worker stopped");
    }

    /// Run one cycle now, waiting for any cycle in flight
    pub async fn run_cycle(&self, mode: CycleMode) -> Result<CycleReport> {
        let shutdown = self.shutdown.subscribe();
        self.cycle(mode, &shutdown).await
    }

    async fn cycle(&self, mode: CycleMode, cancel: &watch::Receiver<bool>) -> Result<CycleReport> {
        let _guard = self.cycle_lock.lock().await;
        let started = Instant::now();

        let rules = {
            let mut ignore = self.ignore.lock();
            ignore.reload();
            ignore.pattern_count()
        };
        debug!("Cycle starting with {} ignore rules", rules);

        let detector = self.detector.clone();
        let indexer = Arc::clone(&self.indexer);
        let (changes, checkpoint_before, checkpoint_now, dirty) = tokio::task::spawn_blocking(move || -> Result<_> {
            let checkpoint_before = indexer.db().get_meta(CHECKPOINT_KEY)?;
            // Read before detection so edits made during the cycle are seen next time
            let checkpoint_now = detector.current_checkpoint();
            let since = match mode {
                CycleMode::Full => None,
                CycleMode::Incremental => checkpoint_before.as_deref(),
            };
            let mut changes = detector.changes_since(since)?;
            match changes.source {
                ChangeSource::FullScan => reconcile_deletions(&indexer, &mut changes.events)?,
                ChangeSource::Delta => {
                    let pending = load_dirty_paths(&indexer)?;
                    merge_events(&mut changes.events, detector.revisit(pending.as_slice()));
                }
            }
            let dirty = dirty_paths(&detector, checkpoint_now.as_deref(), &changes.events);
            Ok((changes, checkpoint_before, checkpoint_now, dirty))
        })
        .await??;

        let mut report = CycleReport {
            mode: match changes.source {
                ChangeSource::FullScan => CycleMode::Full,
                ChangeSource::Delta => CycleMode::Incremental,
            },
            indexed: 0,
            unchanged: 0,
            deleted: 0,
            skipped: 0,
            failed: 0,
            summarized: 0,
            cancelled: false,
            checkpoint_before: checkpoint_before.clone(),
            checkpoint_after: checkpoint_before,
            duration_ms: 0,
        };

        let tasks: Vec<Task> = {
            let ignore = self.ignore.lock();
            let mut tasks = Vec::with_capacity(changes.events.len());
            for event in changes.events {
                match event.kind {
                    ChangeKind::Deleted => tasks.push(Task::Delete(event.path)),
                    _ if self.is_eligible(&ignore, &event.path) => tasks.push(Task::Index(event.path)),
                    _ => report.skipped += 1,
                }
            }
            tasks
        };
        debug!("Cycle has {} tasks, {} skipped", tasks.len(), report.skipped);

        let parallelism = self.config.indexing.parallelism.max(1);
        let results: Vec<FileResult> = stream::iter(tasks)
            .map(|task| {
                let indexer = Arc::clone(&self.indexer);
                let cancel = cancel.clone();
                async move {
                    let cancelled = *cancel.borrow();
                    if cancelled {
                        return FileResult::Cancelled;
                    }
                    match tokio::task::spawn_blocking(move || run_task(&indexer, task)).await {
                        Ok(result) => result,
                        Err(e) => {
                            error!("Indexing task panicked: {}", e);
                            FileResult::Failed
                        }
                    }
                }
            })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        let mut fresh = Vec::new();
        for result in results {
            match result {
                FileResult::Indexed(path) => {
                    report.indexed += 1;
                    fresh.push(path);
                }
                FileResult::Unchanged => {
                    report.indexed += 1;
                    report.unchanged += 1;
                }
                FileResult::Deleted { removed: true } => report.deleted += 1,
                FileResult::Deleted { removed: false } => report.skipped += 1,
                FileResult::Failed => report.failed += 1,
                FileResult::Cancelled => report.cancelled = true,
            }
        }
        report.cancelled |= *cancel.borrow();

        if self.config.indexing.enable_summaries && !report.cancelled && !fresh.is_empty() {
            let indexer = Arc::clone(&self.indexer);
            report.summarized = tokio::task::spawn_blocking(move || {
                let inputs: Vec<_> = fresh.iter().filter_map(|path| indexer.summary_input(path)).collect();
                indexer.batch_summarize_files(&inputs)
            })
            .await
            .unwrap_or_else(|e| {
                error!("Summary batch panicked: {}", e);
                0
            });
        }

        if report.cancelled {
            info!("Cycle cancelled; checkpoint stays at {:?}", report.checkpoint_before);
        } else if let Some(checkpoint) = checkpoint_now {
            let indexer = Arc::clone(&self.indexer);
            let value = checkpoint.clone();
            let saved = tokio::task::spawn_blocking(move || -> Result<()> {
                indexer.db().set_meta(DIRTY_PATHS_KEY, &serde_json::to_string(&dirty)?)?;
                indexer.db().set_meta(CHECKPOINT_KEY, &value)?;
                Ok(())
            })
            .await;
            match saved {
                Ok(Ok(())) => report.checkpoint_after = Some(checkpoint),
                Ok(Err(e)) => error!("Failed to save checkpoint: {:#}", e),
                Err(e) => error!("Checkpoint task panicked: {}", e),
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.reports.send_replace(Some(report.clone()));
        Ok(report)
    }
}

/// Add `deleted` events for indexed paths a full walk no longer finds
fn reconcile_deletions(indexer: &Indexer, events: &mut Vec<ChangeEvent>) -> Result<()> {
    let seen: HashSet<&str> = events.iter().map(|e| e.path.as_str()).collect();
    let missing: Vec<String> = indexer
        .db()
        .indexed_paths()?
        .into_iter()
        .filter(|path| !seen.contains(path.as_str()))
        .collect();

    if !missing.is_empty() {
        debug!("{} indexed files are gone from disk", missing.len());
    }
    events.extend(missing.into_iter().map(|path| ChangeEvent::new(path, ChangeKind::Deleted)));
    Ok(())
}

fn load_dirty_paths(indexer: &Indexer) -> Result<Vec<String>> {
    let Some(raw) = indexer.db().get_meta(DIRTY_PATHS_KEY)? else {
        return Ok(Vec::new());
    };
    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Discarding unreadable {} entry: {}", DIRTY_PATHS_KEY, e);
        Vec::new()
    }))
}

/// Append `extra` events for paths the detected set does not already cover
fn merge_events(events: &mut Vec<ChangeEvent>, extra: Vec<ChangeEvent>) {
    let seen: HashSet<String> = events.iter().map(|e| e.path.clone()).collect();
    let extra: Vec<ChangeEvent> = extra.into_iter().filter(|e| !seen.contains(&e.path)).collect();
    if !extra.is_empty() {
        debug!("Revisiting {} paths left uncommitted last cycle", extra.len());
    }
    events.extend(extra);
}

/// Paths whose working copy differs from the checkpoint about to be saved.
/// If that diff fails, every path this cycle touched is kept instead.
fn dirty_paths(detector: &ChangeDetector, checkpoint: Option<&str>, events: &[ChangeEvent]) -> Vec<String> {
    let Some(checkpoint) = checkpoint else {
        return Vec::new();
    };
    match detector.delta(checkpoint) {
        Ok(delta) => delta.into_iter().map(|e| e.path).collect(),
        Err(e) => {
            warn!("Could not list uncommitted paths: {}", e);
            events.iter().map(|e| e.path.clone()).collect()
        }
    }
}

fn run_task(indexer: &Indexer, task: Task) -> FileResult {
    match task {
        Task::Delete(path) => match indexer.delete_file(&path) {
            Ok(deletion) => FileResult::Deleted {
                removed: deletion.record || deletion.chunks > 0,
            },
            Err(e) => {
                error!("Failed to remove {}: {}", path, e);
                FileResult::Failed
            }
        },
        Task::Index(path) => match indexer.index_file(&path) {
            IndexOutcome::Indexed { .. } => FileResult::Indexed(path),
            IndexOutcome::Unchanged => FileResult::Unchanged,
            IndexOutcome::NotFound => {
                warn!("{} disappeared before it could be indexed", path);
                FileResult::Failed
            }
            IndexOutcome::Failed(_) => FileResult::Failed,
        },
    }
}
