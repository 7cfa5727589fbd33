// Change detection: full filesystem walks and git deltas

use git2::{Delta, DiffFindOptions, DiffOptions, Repository};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IndexError, Result};

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        })
    }
}

/// A project-relative path plus its change kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self { path: path.into(), kind }
    }
}

/// How a change set was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    FullScan,
    Delta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet {
    pub events: Vec<ChangeEvent>,
    pub source: ChangeSource,
}

/// Finds files that changed under a project root
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    root: PathBuf,
}

impl ChangeDetector {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every file under the root tagged `added`, sorted, `.git` skipped
    pub fn full_scan(&self) -> Result<Vec<ChangeEvent>> {
        if !self.root.is_dir() {
            return Err(IndexError::NotFound(self.root.display().to_string()));
        }

        let mut events = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_path(&self.root, entry.path()) {
                events.push(ChangeEvent::new(rel, ChangeKind::Added));
            }
        }

        events.sort_by(|a, b| a.path.cmp(&b.path));
        info!("Found {} files in {}", events.len(), self.root.display());
        Ok(events)
    }

    /// Changes from the `since` commit to the working tree, including staged,
    /// unstaged and untracked files. Renames become delete + add.
    pub fn delta(&self, since: &str) -> Result<Vec<ChangeEvent>> {
        let repo = Repository::discover(&self.root)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| git2::Error::from_str("repository has no working directory"))?;
        let workdir = workdir.canonicalize()?;
        let prefix = self
            .root
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let old_tree = repo.revparse_single(since)?.peel_to_commit()?.tree()?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let mut diff = repo.diff_tree_to_workdir_with_index(Some(&old_tree), Some(&mut opts))?;

        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut events = Vec::new();
        let mut push = |path: Option<&Path>, kind: ChangeKind| {
            let rel = path.and_then(|p| p.strip_prefix(&prefix).ok()).map(slash_path);
            if let Some(rel) = rel.filter(|r| !r.is_empty()) {
                events.push(ChangeEvent::new(rel, kind));
            }
        };

        for delta in diff.deltas() {
            let old_path = delta.old_file().path();
            let new_path = delta.new_file().path();
            match delta.status() {
                Delta::Added | Delta::Untracked | Delta::Copied => push(new_path, ChangeKind::Added),
                Delta::Modified | Delta::Typechange | Delta::Conflicted => push(new_path, ChangeKind::Modified),
                Delta::Deleted => push(old_path, ChangeKind::Deleted),
                Delta::Renamed => {
                    push(old_path, ChangeKind::Deleted);
                    push(new_path, ChangeKind::Added);
                }
                _ => {}
            }
        }

        debug!("Git delta since {} returned {} changes", since, events.len());
        Ok(events)
    }

    /// Delta since `checkpoint`, or a full scan when there is no checkpoint
    /// or the delta cannot be computed.
    pub fn changes_since(&self, checkpoint: Option<&str>) -> Result<ChangeSet> {
        if let Some(since) = checkpoint {
            match self.delta(since) {
                Ok(events) => {
                    return Ok(ChangeSet { events, source: ChangeSource::Delta });
                }
                Err(e) => warn!("Git delta since {} failed, falling back to full scan: {}", since, e),
            }
        }

        Ok(ChangeSet { events: self.full_scan()?, source: ChangeSource::FullScan })
    }

    /// Events for paths an earlier delta saw as uncommitted: `modified` if
    /// the file is still there, `deleted` otherwise. Reverted edits and
    /// removed untracked files never show up in a later diff.
    pub fn revisit<S: AsRef<str>>(&self, paths: &[S]) -> Vec<ChangeEvent> {
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let kind = if self.root.join(path).is_file() {
                    ChangeKind::Modified
                } else {
                    ChangeKind::Deleted
                };
                ChangeEvent::new(path, kind)
            })
            .collect()
    }

    /// Current HEAD commit id, if the root is inside a repository with commits
    pub fn current_checkpoint(&self) -> Option<String> {
        let repo = Repository::discover(&self.root).ok()?;
        let head = repo.head().ok()?;
        let commit = head.peel_to_commit().ok()?;
        Some(commit.id().to_string())
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `root` with `/` separators
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let rel = slash_path(rel);
    if rel.is_empty() {
        None
    } else {
        Some(rel)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use git2::{IndexAddOption, Oid, Signature};
    use std::fs;
    use tempfile::tempdir;

    /// Stage everything (including deletions) and commit on HEAD
    pub(crate) fn commit_all(repo: &Repository, message: &str) -> Oid {
        let mut index = repo.index().unwrap();
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("test", "test@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs).unwrap()
    }

    fn sorted(mut events: Vec<ChangeEvent>) -> Vec<(String, ChangeKind)> {
        events.sort_by(|a, b| (a.path.as_str(), a.kind as u8).cmp(&(b.path.as_str(), b.kind as u8)));
        events.into_iter().map(|e| (e.path, e.kind)).collect()
    }

    #[test]
    fn test_full_scan_skips_git_dir() {
        let dir = tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/nested/b.py"), "x = 1").unwrap();
        fs::write(dir.path().join("a.py"), "y = 2").unwrap();

        let events = ChangeDetector::new(dir.path()).full_scan().unwrap();
        let paths: Vec<_> = events.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "src/nested/b.py"]);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Added));
    }

    #[test]
    fn test_full_scan_of_missing_root() {
        let dir = tempdir().unwrap();
        let detector = ChangeDetector::new(dir.path().join("missing"));
        assert!(matches!(detector.full_scan(), Err(IndexError::NotFound(_))));
    }

    #[test]
    fn test_delta_tracks_worktree_changes() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.py"), "def a(): pass\n").unwrap();
        fs::write(dir.path().join("b.py"), "def b(): pass\n").unwrap();
        let first = commit_all(&repo, "initial");

        let detector = ChangeDetector::new(dir.path());
        assert_eq!(detector.current_checkpoint(), Some(first.to_string()));
        assert!(detector.delta(&first.to_string()).unwrap().is_empty());

        fs::write(dir.path().join("a.py"), "def a(): return 1\n").unwrap();
        fs::remove_file(dir.path().join("b.py")).unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/c.py"), "def c(): pass\n").unwrap();

        let expected = vec![
            ("a.py".to_string(), ChangeKind::Modified),
            ("b.py".to_string(), ChangeKind::Deleted),
            ("pkg/c.py".to_string(), ChangeKind::Added),
        ];
        assert_eq!(sorted(detector.delta(&first.to_string()).unwrap()), expected);

        // Committing does not change what differs from the checkpoint
        commit_all(&repo, "second");
        assert_eq!(sorted(detector.delta(&first.to_string()).unwrap()), expected);
    }

    #[test]
    fn test_revisit_checks_existence() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/kept.py"), "pass\n").unwrap();

        let events = ChangeDetector::new(dir.path()).revisit(&["pkg/kept.py", "gone.py", "pkg"][..]);
        assert_eq!(
            events,
            vec![
                ChangeEvent::new("pkg/kept.py", ChangeKind::Modified),
                ChangeEvent::new("gone.py", ChangeKind::Deleted),
                ChangeEvent::new("pkg", ChangeKind::Deleted),
            ]
        );
    }

    #[test]
    fn test_delta_scoped_to_subdirectory() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("service")).unwrap();
        fs::write(dir.path().join("service/app.py"), "pass\n").unwrap();
        fs::write(dir.path().join("other.py"), "pass\n").unwrap();
        let first = commit_all(&repo, "initial");

        fs::write(dir.path().join("service/app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("other.py"), "y = 1\n").unwrap();

        let detector = ChangeDetector::new(dir.path().join("service"));
        let events = detector.delta(&first.to_string()).unwrap();
        assert_eq!(events, vec![ChangeEvent::new("app.py", ChangeKind::Modified)]);
    }

    #[test]
    fn test_changes_since_falls_back_to_full_scan() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "pass\n").unwrap();
        let detector = ChangeDetector::new(dir.path());

        assert!(detector.current_checkpoint().is_none());

        let set = detector.changes_since(None).unwrap();
        assert_eq!(set.source, ChangeSource::FullScan);

        // Not a repository: the delta fails and the full walk is used
        let set = detector.changes_since(Some("deadbeef")).unwrap();
        assert_eq!(set.source, ChangeSource::FullScan);
        assert_eq!(set.events, vec![ChangeEvent::new("a.py", ChangeKind::Added)]);
    }

    #[test]
    fn test_unknown_checkpoint_falls_back() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.py"), "pass\n").unwrap();
        commit_all(&repo, "initial");

        let set = ChangeDetector::new(dir.path())
            .changes_since(Some("0000000000000000000000000000000000000001"))
            .unwrap();
        assert_eq!(set.source, ChangeSource::FullScan);
    }
}
