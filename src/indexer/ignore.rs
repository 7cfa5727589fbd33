// Repository ignore rules (.gitignore at the project root)

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const IGNORE_FILE: &str = ".gitignore";

/// Answers whether a project-relative path is excluded by the root
/// `.gitignore`. Later patterns override earlier ones, a trailing `/`
/// matches directories only and `!` re-includes.
#[derive(Debug)]
pub struct IgnoreFilter {
    root: PathBuf,
    matcher: Option<Gitignore>,
}

impl IgnoreFilter {
    /// Load rules from `<root>/.gitignore`; a missing or unreadable file
    /// means nothing is ignored.
    pub fn load(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let matcher = Self::read_rules(&root);
        Self { root, matcher }
    }

    /// Build from in-memory patterns, one per entry
    pub fn from_patterns(root: impl AsRef<Path>, patterns: &[&str]) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut builder = GitignoreBuilder::new(&root);
        for pattern in patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                warn!("Skipping invalid ignore pattern {:?}: {}", pattern, e);
            }
        }
        let matcher = builder
            .build()
            .map_err(|e| warn!("Failed to build ignore rules: {}", e))
            .ok()
            .filter(|m| !m.is_empty());
        Self { root, matcher }
    }

    /// Re-read the rules file; cheap enough to call once per cycle
    pub fn reload(&mut self) {
        self.matcher = Self::read_rules(&self.root);
    }

    fn read_rules(root: &Path) -> Option<Gitignore> {
        let path = root.join(IGNORE_FILE);
        if !path.is_file() {
            debug!("No {} found in {}", IGNORE_FILE, root.display());
            return None;
        }

        let mut builder = GitignoreBuilder::new(root);
        if let Some(e) = builder.add(&path) {
            // Partial errors still leave the valid lines loaded
            warn!("Problem reading {}: {}", path.display(), e);
        }

        match builder.build() {
            Ok(matcher) => {
                info!("Loaded {} ignore patterns from {}", matcher.num_ignores() + matcher.num_whitelists(), path.display());
                Some(matcher)
            }
            Err(e) => {
                warn!("Failed to build ignore rules from {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn pattern_count(&self) -> u64 {
        self.matcher
            .as_ref()
            .map(|m| m.num_ignores() + m.num_whitelists())
            .unwrap_or(0)
    }

    /// `path` is relative to the project root, `/` or `\` separated
    pub fn is_ignored(&self, path: &str) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };

        let normalized = path.replace('\\', "/");
        let relative = normalized.trim_start_matches("./").trim_start_matches('/');
        if relative.is_empty() {
            return false;
        }

        matcher
            .matched_path_or_any_parents(Path::new(relative), false)
            .is_ignore()
    }
}
