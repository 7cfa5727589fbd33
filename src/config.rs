// Configuration management for repograph

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::indexer::parser::Language;

pub const CONFIG_FILE: &str = ".repograph.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub languages: LanguagesConfig,
    pub indexing: IndexingConfig,
    pub chunking: ChunkingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    /// Repository root, relative to the directory holding the config file
    pub root: String,
    /// Index database, relative to the root unless absolute
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagesConfig {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Extension allow-list, each with a leading dot
    pub extensions: Vec<String>,
    /// Paths containing any of these substrings are never indexed
    pub ignore_patterns: Vec<String>,
    pub interval_secs: u64,
    pub parallelism: usize,
    pub enable_ast: bool,
    /// Files larger than this (bytes) are chunked but not parsed
    pub ast_max_file_size: u64,
    pub enable_summaries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-project".to_string(),
            root: ".".to_string(),
            db_path: ".repograph/index.db".to_string(),
        }
    }
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            enabled: Language::ALL.iter().map(|l| l.name().to_string()).collect(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            extensions: [
                ".py", ".pyi", ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".go", ".rs", ".java", ".md",
                ".json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ignore_patterns: [".git", "node_modules", ".venv", "__pycache__", ".repograph"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            interval_secs: 300,
            parallelism: 1,
            enable_ast: true,
            ast_max_file_size: 500_000,
            enable_summaries: true,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.repograph.toml` from the project directory, falling back to
    /// defaults, then apply `REPOGRAPH_*` environment overrides.
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE);

        let mut config = if config_path.is_file() {
            match Self::from_file(&config_path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Ignoring invalid config {}: {:#}", config_path.display(), e);
                    Self::default()
                }
            }
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides looked up by variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("REPOGRAPH_ROOT") {
            self.project.root = root;
        }
        if let Some(db_path) = lookup("REPOGRAPH_DB_PATH") {
            self.project.db_path = db_path;
        }
        if let Some(interval) = lookup("REPOGRAPH_INTERVAL") {
            match interval.parse::<u64>() {
                Ok(secs) if secs > 0 => self.indexing.interval_secs = secs,
                _ => tracing::warn!("Ignoring invalid REPOGRAPH_INTERVAL: {}", interval),
            }
        }
        if let Some(level) = lookup("REPOGRAPH_LOG_LEVEL") {
            self.logging.level = level.to_ascii_lowercase();
        }
    }

    /// Repository root for a project directory
    pub fn root_dir(&self, project_dir: &Path) -> PathBuf {
        let root = Path::new(&self.project.root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            project_dir.join(root)
        }
    }

    /// Database location for a repository root
    pub fn db_path(&self, root: &Path) -> PathBuf {
        let db = Path::new(&self.project.db_path);
        if db.is_absolute() {
            db.to_path_buf()
        } else {
            root.join(db)
        }
    }

    /// Enabled languages that have an extractor
    pub fn enabled_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self
            .languages
            .enabled
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        languages.sort();
        languages.dedup();
        languages
    }

    /// Extension allow-list check; `path` may be relative or absolute
    pub fn has_allowed_extension(&self, path: &str) -> bool {
        let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_ascii_lowercase());
        self.indexing.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&dotted))
    }

    /// Substring ignore check
    pub fn matches_ignore_pattern(&self, path: &str) -> bool {
        self.indexing
            .ignore_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && path.contains(pattern.as_str()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.db_path.is_empty() {
            bail!("Database path cannot be empty");
        }

        for lang in &self.languages.enabled {
            if lang.parse::<Language>().is_err() {
                bail!("Unsupported language: {}", lang);
            }
        }

        for ext in &self.indexing.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                bail!("Extension must start with a dot: {}", ext);
            }
        }
        if self.indexing.interval_secs == 0 {
            bail!("Indexing interval must be greater than 0");
        }
        if self.indexing.parallelism == 0 {
            bail!("Parallelism must be greater than 0");
        }
        if self.indexing.ast_max_file_size == 0 {
            bail!("AST size ceiling must be greater than 0");
        }

        if self.chunking.chunk_size == 0 {
            bail!("Chunk size must be greater than 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!("Invalid log level: {}", self.logging.level);
        }
        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.name, "unnamed-project");
        assert_eq!(config.indexing.interval_secs, 300);
        assert_eq!(config.enabled_languages().len(), Language::ALL.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[project]\nname = \"demo\"\n\n[indexing]\ninterval_secs = 30\nparallelism = 4\n",
        )
        .unwrap();

        let config = Config::from_project_dir(dir.path());
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.indexing.interval_secs, 30);
        assert_eq!(config.indexing.parallelism, 4);
        assert!(config.indexing.enable_ast);
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[languages]\nenabled = [\"cobol\"]\n").unwrap();

        assert!(Config::from_file(dir.path().join(CONFIG_FILE)).is_err());
        let config = Config::from_project_dir(dir.path());
        assert_eq!(config.project.name, "unnamed-project");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("REPOGRAPH_DB_PATH", "/tmp/graph.db"),
            ("REPOGRAPH_INTERVAL", "15"),
            ("REPOGRAPH_LOG_LEVEL", "DEBUG"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.indexing.interval_secs, 15);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.db_path(Path::new("/repo")), PathBuf::from("/tmp/graph.db"));

        let mut config = Config::default();
        config.apply_overrides(|key| (key == "REPOGRAPH_INTERVAL").then(|| "soon".to_string()));
        assert_eq!(config.indexing.interval_secs, 300);
    }

    #[test]
    fn test_paths_resolve_against_root() {
        let config = Config::default();
        let root = config.root_dir(Path::new("/work/repo"));
        assert_eq!(root, PathBuf::from("/work/repo/."));
        assert_eq!(
            config.db_path(Path::new("/work/repo")),
            PathBuf::from("/work/repo/.repograph/index.db")
        );
    }

    #[test]
    fn test_eligibility_checks() {
        let config = Config::default();
        assert!(config.has_allowed_extension("src/app.py"));
        assert!(config.has_allowed_extension("README.MD"));
        assert!(!config.has_allowed_extension("debug.log"));
        assert!(!config.has_allowed_extension("Makefile"));

        assert!(config.matches_ignore_pattern("web/node_modules/x/index.js"));
        assert!(config.matches_ignore_pattern(".repograph/index.db"));
        assert!(!config.matches_ignore_pattern("src/app.py"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
        config.chunking.chunk_overlap = 200;

        config.indexing.extensions.push("py".to_string());
        assert!(config.validate().is_err());
        config.indexing.extensions.pop();

        config.indexing.parallelism = 0;
        assert!(config.validate().is_err());
        config.indexing.parallelism = 2;

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
        config.logging.format = "json".to_string();

        assert!(config.validate().is_ok());
    }
}
