//! Directory traversal filtered by ignore rules.
//!
//! Uses the `ignore` crate's walker with its built-in filters switched off;
//! exclusion is decided solely by the [`IgnoreRules`] handed in, so the rule
//! sources and their order are fully controlled by the caller.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ignore_rules::IgnoreRules;

/// Directory name that is never descended into.
const VCS_DIR: &str = ".git";

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A directory or entry could not be read. Its subtree is skipped.
    #[error("cannot read {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("symlink loop detected: {path}")]
    SymlinkLoop { path: PathBuf },
}

impl WalkError {
    /// Whether the walk as a whole cannot proceed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WalkError::NotFound { .. } | WalkError::NotADirectory { .. })
    }

    fn from_ignore(err: ignore::Error, path: Option<PathBuf>) -> Self {
        match err {
            ignore::Error::WithPath { path, err } => Self::from_ignore(*err, Some(path)),
            ignore::Error::WithDepth { err, .. } => Self::from_ignore(*err, path),
            ignore::Error::WithLineNumber { err, .. } => Self::from_ignore(*err, path),
            ignore::Error::Loop { child, .. } => WalkError::SymlinkLoop { path: child },
            ignore::Error::Io(source) => WalkError::Access {
                path: path.unwrap_or_default(),
                source,
            },
            other => WalkError::Access {
                path: path.unwrap_or_default(),
                source: io::Error::other(other.to_string()),
            },
        }
    }
}

/// A `/`-separated path relative to the walk base.
///
/// Never empty, never absolute, and never contains `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PathEntry(String);

impl PathEntry {
    /// Build an entry from a relative filesystem path.
    ///
    /// Returns `None` for empty, absolute, or parent-escaping paths.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_string_lossy()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(Self(segments.join("/")))
    }

    /// Build an entry from a `/`-separated string.
    pub fn parse(path: &str) -> Option<Self> {
        Self::from_relative(Path::new(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from the base downwards.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The final segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathEntry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for PathEntry {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// What emitted paths are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathBase {
    /// Relative to the walk root: `src/main.js`.
    #[default]
    Root,
    /// Relative to the root's parent, so every path starts with the root
    /// directory's name: `my-app/src/main.js`.
    Parent,
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Test directories against the ignore rules too and skip matches wholesale.
    ///
    /// When false only files are tested, so an ignored directory is still
    /// traversed and its files filtered one by one. Rules with a `!` pattern
    /// always walk that way, since a negation can re-include a file beneath
    /// an excluded directory.
    pub prune_ignored_dirs: bool,
    /// Base that emitted paths are relative to.
    pub base: PathBase,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: true,
            prune_ignored_dirs: true,
            base: PathBase::Root,
        }
    }
}

impl WalkOptions {
    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the base for emitted paths.
    pub fn base(mut self, base: PathBase) -> Self {
        self.base = base;
        self
    }

    /// Only filter files, never prune directories.
    pub fn without_pruning(mut self) -> Self {
        self.prune_ignored_dirs = false;
        self
    }
}

/// Walk a directory tree, yielding the files that survive the ignore rules.
///
/// Entries are sorted by file name within each directory, so the output order
/// is stable for an unchanged filesystem. An unreadable directory yields a
/// [`WalkError::Access`] item and the walk carries on with its siblings.
///
/// # Examples
///
/// ```no_run
/// use codesum::ignore_rules::IgnoreRules;
/// use codesum::walker::{walk, WalkOptions};
/// use std::path::Path;
///
/// let rules = IgnoreRules::empty();
/// for entry in walk(Path::new("."), &rules, &WalkOptions::default()).flatten() {
///     println!("{entry}");
/// }
/// ```
pub fn walk(
    root: &Path,
    rules: &IgnoreRules,
    options: &WalkOptions,
) -> Box<dyn Iterator<Item = Result<PathEntry, WalkError>>> {
    let root = match resolve_root(root) {
        Ok(root) => root,
        Err(e) => return Box::new(std::iter::once(Err(e))),
    };

    let base = match options.base {
        PathBase::Root => root.clone(),
        PathBase::Parent => root.parent().map_or_else(|| root.clone(), Path::to_path_buf),
    };

    let mut builder = WalkBuilder::new(&root);
    builder
        .standard_filters(false)
        .hidden(!options.include_hidden)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth)
        .sort_by_file_name(|a, b| a.cmp(b));

    let filter_root = root.clone();
    let filter_rules = rules.clone();
    let prune = options.prune_ignored_dirs && !rules.has_negations();
    if options.prune_ignored_dirs && !prune {
        debug!("ignore rules contain negations, filtering files only");
    }
    builder.filter_entry(move |entry| keep_entry(entry, &filter_root, &filter_rules, prune));

    Box::new(builder.build().filter_map(move |result| match result {
        Ok(entry) => {
            if entry.depth() == 0 || !is_file_like(&entry) {
                return None;
            }
            let relative = entry.path().strip_prefix(&base).ok()?;
            PathEntry::from_relative(relative).map(Ok)
        }
        Err(err) => Some(Err(WalkError::from_ignore(err, None))),
    }))
}

/// Canonical form of the walk root, which must be an existing directory.
fn resolve_root(root: &Path) -> Result<PathBuf, WalkError> {
    let resolved = root.canonicalize().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => WalkError::NotFound {
            path: root.to_path_buf(),
        },
        _ => WalkError::Access {
            path: root.to_path_buf(),
            source,
        },
    })?;

    if !resolved.is_dir() {
        return Err(WalkError::NotADirectory { path: resolved });
    }
    Ok(resolved)
}

fn keep_entry(entry: &DirEntry, root: &Path, rules: &IgnoreRules, prune: bool) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let Ok(relative) = entry.path().strip_prefix(root) else {
        return true;
    };

    if entry.file_type().is_some_and(|ft| ft.is_dir()) {
        if entry.file_name() == VCS_DIR {
            return false;
        }
        if prune && rules.matches_dir(relative) {
            debug!(path = %relative.display(), "pruning ignored directory");
            return false;
        }
        return true;
    }

    if rules.matches(relative) {
        debug!(path = %relative.display(), "ignoring file");
        return false;
    }
    true
}

/// Regular files, and symlinks that resolve to regular files.
fn is_file_like(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_file() => true,
        Some(ft) if ft.is_symlink() => entry.path().is_file(),
        _ => false,
    }
}

/// Outcome of a complete walk.
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Surviving files in walk order.
    pub paths: Vec<PathEntry>,
    /// Subtrees that could not be read.
    pub failures: Vec<WalkError>,
}

/// Drain a walk into a [`WalkReport`].
///
/// Fails only if the root itself is missing or not a directory; every other
/// error is logged and recorded in [`WalkReport::failures`].
pub fn collect_paths(
    root: &Path,
    rules: &IgnoreRules,
    options: &WalkOptions,
) -> Result<WalkReport, WalkError> {
    let mut report = WalkReport::default();

    for result in walk(root, rules, options) {
        match result {
            Ok(entry) => report.paths.push(entry),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("skipping unreadable subtree: {e}");
                report.failures.push(e);
            }
        }
    }

    debug!(
        files = report.paths.len(),
        failures = report.failures.len(),
        "walk finished"
    );
    Ok(report)
}
