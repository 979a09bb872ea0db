//! Fluent builder API for codesum.
//!
//! Ties the pieces together: ignore sources → rules → walk → tree → lines,
//! and walk → script selection → extractor → summarizer.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::info;

use crate::components::ComponentExtractor;
use crate::config::{default_ignore_files, validate_root, Config, ConfigError};
use crate::errors::CodesumError;
use crate::ignore_rules::{load_pattern_sources, IgnoreRules};
use crate::summarize::{summarize_file, FileSummary, Summarizer};
use crate::tree::{render, render_document, NumberedLine, TreeNode};
use crate::walker::{collect_paths, PathBase, PathEntry, WalkError, WalkOptions, WalkReport};

/// Builder for summarizing a codebase.
///
/// # Examples
///
/// ```no_run
/// use codesum::builder::Codesum;
/// use codesum::walker::PathBase;
///
/// let summary = Codesum::new("./my-app")
///     .base(PathBase::Parent)
///     .tree()
///     .unwrap();
///
/// print!("{}", summary.document());
/// ```
pub struct Codesum {
    root: PathBuf,
    ignore_files: Vec<PathBuf>,
    walk_options: WalkOptions,
}

impl Codesum {
    /// Create a builder for `root` with the default ignore sources.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            ignore_files: default_ignore_files(&root, Path::new(".")),
            root,
            walk_options: WalkOptions::default(),
        }
    }

    /// Create a builder from a complete configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.root.clone(),
            ignore_files: config.ignore_files.clone(),
            walk_options: config.walk.clone(),
        }
    }

    /// Replace the ignore sources. Order matters: later files override earlier ones.
    pub fn ignore_files(mut self, files: Vec<PathBuf>) -> Self {
        self.ignore_files = files;
        self
    }

    /// Append an ignore source with the highest precedence so far.
    pub fn ignore_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.ignore_files.push(file.into());
        self
    }

    /// Test directories against the ignore rules (default: true).
    pub fn prune_ignored_dirs(mut self, prune: bool) -> Self {
        self.walk_options.prune_ignored_dirs = prune;
        self
    }

    /// Include hidden files (default: true).
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.walk_options.include_hidden = include;
        self
    }

    /// Set maximum directory depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.walk_options.max_depth = Some(depth);
        self
    }

    /// Set what emitted paths are relative to.
    pub fn base(mut self, base: PathBase) -> Self {
        self.walk_options.base = base;
        self
    }

    /// Load the ignore sources and compile them.
    pub fn rules(&self) -> IgnoreRules {
        let sources = load_pattern_sources(&self.ignore_files);
        IgnoreRules::from_sources(&self.root, &sources)
    }

    /// Walk the root and collect surviving files.
    pub fn walk(&self) -> Result<WalkReport, CodesumError> {
        self.walk_with(&self.walk_options)
    }

    fn walk_with(&self, options: &WalkOptions) -> Result<WalkReport, CodesumError> {
        validate_root(&self.root)?;
        let rules = self.rules();
        info!(root = %self.root.display(), rules = rules.len(), "walking codebase");

        collect_paths(&self.root, &rules, options).map_err(|e| match e {
            WalkError::NotFound { path } => ConfigError::RootNotFound(path).into(),
            WalkError::NotADirectory { path } => ConfigError::RootNotADirectory(path).into(),
            other => other.into(),
        })
    }

    /// Walk, build, and render the tree.
    pub fn tree(&self) -> Result<TreeSummary, CodesumError> {
        let report = self.walk()?;
        let tree = TreeNode::from_paths(&report.paths);
        let lines = render(&tree);
        info!(
            files = tree.file_count(),
            directories = tree.directory_count(),
            "built tree"
        );

        Ok(TreeSummary {
            tree,
            lines,
            failures: report.failures,
        })
    }

    /// Summarize every file matching `include`.
    ///
    /// Paths are always reported relative to the root. Collaborator failures
    /// are downgraded per file; see [`summarize_file`].
    pub fn summarize(
        &self,
        include: &[Pattern],
        extractor: &dyn ComponentExtractor,
        summarizer: &dyn Summarizer,
    ) -> Result<SummaryReport, CodesumError> {
        let options = self.walk_options.clone().base(PathBase::Root);
        let report = self.walk_with(&options)?;

        let files: Vec<_> = select_files(&report.paths, include);
        info!(selected = files.len(), walked = report.paths.len(), "summarizing files");

        let summaries = files
            .into_iter()
            .map(|entry| summarize_file(&self.root, entry, extractor, summarizer))
            .collect();

        Ok(SummaryReport {
            summaries,
            failures: report.failures,
        })
    }
}

/// Files whose relative path or file name matches any pattern.
pub fn select_files<'a>(paths: &'a [PathEntry], include: &[Pattern]) -> Vec<&'a PathEntry> {
    paths
        .iter()
        .filter(|entry| {
            include
                .iter()
                .any(|p| p.matches(entry.as_str()) || p.matches(entry.file_name()))
        })
        .collect()
}

/// A rendered codebase tree.
#[derive(Debug)]
pub struct TreeSummary {
    pub tree: TreeNode,
    pub lines: Vec<NumberedLine>,
    /// Subtrees skipped because they could not be read.
    pub failures: Vec<WalkError>,
}

impl TreeSummary {
    /// The full text artifact: legend plus tree lines.
    pub fn document(&self) -> String {
        render_document(&self.tree)
    }
}

/// Per-file summaries for a codebase.
#[derive(Debug)]
pub struct SummaryReport {
    pub summaries: Vec<FileSummary>,
    /// Subtrees skipped because they could not be read.
    pub failures: Vec<WalkError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TreeSitterExtractor;
    use crate::summarize::SummarizeError;
    use std::fs;
    use tempfile::TempDir;

    struct EchoSummarizer;

    impl Summarizer for EchoSummarizer {
        fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
            Ok(format!("echo: {prompt}"))
        }
    }

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("app");

        fs::create_dir_all(root.join("src/sub")).unwrap();
        fs::create_dir_all(root.join("node_modules/react")).unwrap();
        fs::write(root.join("src/a.js"), "function a() {}").unwrap();
        fs::write(root.join("src/sub/b.jsx"), "export function B() {}").unwrap();
        fs::write(root.join("src/debug.log"), "").unwrap();
        fs::write(root.join("node_modules/react/index.js"), "function react() {}").unwrap();
        fs::write(root.join("readme.md"), "# app").unwrap();
        fs::write(root.join(".gitignore"), "node_modules/\n*.log\n").unwrap();

        dir
    }

    fn builder(dir: &TempDir) -> Codesum {
        let root = dir.path().join("app");
        // Keep the test independent of any `.ignore` in the working directory.
        Codesum::new(&root).ignore_files(vec![root.join(".gitignore")])
    }

    #[test]
    fn test_tree_with_parent_base() {
        let dir = create_test_project();

        let summary = builder(&dir).base(PathBase::Parent).tree().unwrap();
        let lines: Vec<String> = summary.lines.iter().map(|l| l.to_string()).collect();

        assert_eq!(
            lines,
            vec![
                "- app/ (1)",
                "  |_ .gitignore (1.1)",
                "  |_ readme.md (1.2)",
                "  |_ src/ (1.3)",
                "    |_ a.js (1.3.1)",
                "    |_ sub/ (1.3.2)",
                "      |_ b.jsx (1.3.2.1)",
            ]
        );
        assert!(summary.failures.is_empty());
        assert!(summary.document().ends_with("      |_ b.jsx (1.3.2.1)\n"));
    }

    #[test]
    fn test_later_ignore_file_overrides() {
        let dir = create_test_project();
        let local = dir.path().join(".ignore");
        fs::write(&local, "!debug.log\nreadme.md\n").unwrap();

        let report = builder(&dir).ignore_file(&local).walk().unwrap();
        let paths: Vec<_> = report.paths.iter().map(|p| p.as_str()).collect();

        assert_eq!(paths, vec![".gitignore", "src/a.js", "src/debug.log", "src/sub/b.jsx"]);
    }

    #[test]
    fn test_missing_root_is_config_error() {
        let err = Codesum::new("/nonexistent/root").tree().unwrap_err();
        assert!(matches!(err, CodesumError::Config(ConfigError::RootNotFound(_))));
    }

    #[test]
    fn test_summarize_selects_scripts() {
        let dir = create_test_project();
        let include = vec![Pattern::new("*.js").unwrap(), Pattern::new("*.jsx").unwrap()];

        let report = builder(&dir)
            .base(PathBase::Parent)
            .summarize(&include, &TreeSitterExtractor::new(), &EchoSummarizer)
            .unwrap();

        let lines: Vec<String> = report.summaries.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "src/a.js: echo: This is a JavaScript file. This file defines the following components: a",
                "src/sub/b.jsx: echo: This is a JSX file. This file defines the following components: B",
            ]
        );
    }

    #[test]
    fn test_select_files() {
        let paths: Vec<_> = ["a.js", "lib/b.jsx", "lib/c.ts", "app.js.map"]
            .iter()
            .filter_map(|p| PathEntry::parse(p))
            .collect();
        let include = vec![Pattern::new("*.js").unwrap(), Pattern::new("lib/*.ts").unwrap()];

        let selected: Vec<_> = select_files(&paths, &include)
            .into_iter()
            .map(|p| p.as_str())
            .collect();
        assert_eq!(selected, vec!["a.js", "lib/c.ts"]);
    }
}
