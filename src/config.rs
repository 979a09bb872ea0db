//! Run configuration.
//!
//! A [`Config`] is assembled once at startup (command-line flags, with
//! environment and `.env` fallbacks) and handed by reference to everything
//! that needs it. Nothing in the library reads the environment on its own.

use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::debug;

use crate::components::{ComponentExtractor, NodeScriptExtractor, TreeSitterExtractor};
use crate::summarize::CompletionSettings;
use crate::tokens::Encoding;
use crate::walker::WalkOptions;

/// Environment variable naming the codebase root.
pub const ROOT_ENV: &str = "CODEBASE_PATH";
/// Environment variable holding the completion API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the completion API base URL.
pub const API_BASE_ENV: &str = "OPENAI_BASE_URL";

pub const OUTPUT_DIR: &str = "summaries";
pub const TREE_ARTIFACT: &str = "codebase-summary.txt";
pub const SUMMARIES_ARTIFACT: &str = "code_summaries.txt";

/// Repository ignore file, looked up in the codebase root.
pub const REPO_IGNORE_FILE: &str = ".gitignore";
/// Local ignore file, looked up in the working directory.
pub const LOCAL_IGNORE_FILE: &str = ".ignore";

/// Script files summarized when no `--include` is given.
pub const DEFAULT_INCLUDE: &[&str] = &["*.js", "*.jsx"];

/// Configuration problems. These abort the run before any walk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no codebase root given (pass --root or set {ROOT_ENV})")]
    MissingRoot,

    #[error("codebase root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("codebase root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("invalid include pattern {pattern:?}: {source}")]
    InvalidInclude {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("extractor script not found: {0}")]
    ScriptNotFound(PathBuf),
}

/// Which component extractor to use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    /// In-process tree-sitter parsing.
    #[default]
    TreeSitter,
    /// `<program> <script> <file>` subprocess.
    NodeScript { program: String, script: PathBuf },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Codebase root to walk.
    pub root: PathBuf,
    /// Ignore-pattern files, in precedence order (later overrides earlier).
    pub ignore_files: Vec<PathBuf>,
    /// Traversal options.
    pub walk: WalkOptions,
    /// Directory receiving the artifacts.
    pub output_dir: PathBuf,
    /// Glob patterns selecting files to summarize.
    pub include: Vec<String>,
    /// Component extractor.
    pub extractor: ExtractorKind,
    /// Completion API settings.
    pub completion: CompletionSettings,
    /// Encoding for artifact token counts.
    pub encoding: Encoding,
}

impl Config {
    /// Configuration with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            ignore_files: default_ignore_files(&root, Path::new(".")),
            root,
            walk: WalkOptions::default(),
            output_dir: PathBuf::from(OUTPUT_DIR),
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            extractor: ExtractorKind::default(),
            completion: CompletionSettings::default(),
            encoding: Encoding::default(),
        }
    }

    /// Check everything that must hold before walking.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_root(&self.root)?;
        self.include_patterns()?;
        if let ExtractorKind::NodeScript { script, .. } = &self.extractor {
            if !script.is_file() {
                return Err(ConfigError::ScriptNotFound(script.clone()));
            }
        }
        Ok(())
    }

    /// Compile the include globs.
    pub fn include_patterns(&self) -> Result<Vec<Pattern>, ConfigError> {
        self.include
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| ConfigError::InvalidInclude {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Build the configured component extractor.
    pub fn component_extractor(&self) -> Box<dyn ComponentExtractor> {
        match &self.extractor {
            ExtractorKind::TreeSitter => Box::new(TreeSitterExtractor::new()),
            ExtractorKind::NodeScript { program, script } => {
                Box::new(NodeScriptExtractor::new(script.clone()).program(program.clone()))
            }
        }
    }

    pub fn tree_artifact_path(&self) -> PathBuf {
        self.output_dir.join(TREE_ARTIFACT)
    }

    pub fn summaries_artifact_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARIES_ARTIFACT)
    }
}

/// The default ignore sources: `<root>/.gitignore`, then `<local_dir>/.ignore`.
pub fn default_ignore_files(root: &Path, local_dir: &Path) -> Vec<PathBuf> {
    vec![root.join(REPO_IGNORE_FILE), local_dir.join(LOCAL_IGNORE_FILE)]
}

/// Resolve an optional root (already merged with the environment by the CLI).
pub fn require_root(root: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match root {
        Some(root) if !root.as_os_str().is_empty() => Ok(root),
        _ => Err(ConfigError::MissingRoot),
    }
}

/// The root must exist and be a directory.
pub fn validate_root(root: &Path) -> Result<(), ConfigError> {
    if !root.exists() {
        return Err(ConfigError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ConfigError::RootNotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Load a `.env` file from the working directory (or its ancestors) into the
/// process environment, returning where it came from.
///
/// Must run before argument parsing so environment fallbacks see its values.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Ok(Some(path))
        }
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new("/repo");
        assert_eq!(
            config.ignore_files,
            vec![PathBuf::from("/repo/.gitignore"), PathBuf::from("./.ignore")]
        );
        assert_eq!(config.tree_artifact_path(), PathBuf::from("summaries/codebase-summary.txt"));
        assert_eq!(config.summaries_artifact_path(), PathBuf::from("summaries/code_summaries.txt"));
        assert_eq!(config.include, vec!["*.js", "*.jsx"]);
        assert!(config.walk.prune_ignored_dirs);
    }

    #[test]
    fn test_require_root() {
        assert!(matches!(require_root(None), Err(ConfigError::MissingRoot)));
        assert!(matches!(require_root(Some(PathBuf::new())), Err(ConfigError::MissingRoot)));
        assert_eq!(require_root(Some("/x".into())).unwrap(), PathBuf::from("/x"));
    }

    #[test]
    fn test_validate_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "").unwrap();

        assert!(validate_root(dir.path()).is_ok());
        assert!(matches!(
            validate_root(&dir.path().join("missing")),
            Err(ConfigError::RootNotFound(_))
        ));
        assert!(matches!(validate_root(&file), Err(ConfigError::RootNotADirectory(_))));
    }

    #[test]
    fn test_invalid_include_pattern() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::new(dir.path());
        config.include = vec!["[".to_string()];

        assert!(matches!(config.validate(), Err(ConfigError::InvalidInclude { .. })));
    }

    #[test]
    fn test_missing_node_script() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::new(dir.path());
        config.extractor = ExtractorKind::NodeScript {
            program: "node".to_string(),
            script: dir.path().join("parse.js"),
        };

        assert!(matches!(config.validate(), Err(ConfigError::ScriptNotFound(_))));
    }
}
