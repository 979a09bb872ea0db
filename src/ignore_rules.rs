//! Layered gitignore-style ignore rules.
//!
//! Rules are gathered from any number of pattern sources (typically the
//! repository `.gitignore` followed by a local `.ignore`), concatenated in
//! order and compiled into a single matcher. Later rules override earlier
//! ones, and `!pattern` re-includes a previously excluded path.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use thiserror::Error;
use tracing::{debug, warn};

/// An ignore-pattern file exists but could not be read.
#[derive(Debug, Error)]
#[error("cannot read ignore patterns from {path}: {source}")]
pub struct PatternSourceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Compiled ignore rules.
///
/// Paths handed to [`IgnoreRules::matches`] are relative to the walk root and
/// `/`-separated. Cloning is cheap enough to hand a copy to a walker filter.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    gitignore: Gitignore,
}

impl IgnoreRules {
    /// A matcher that excludes nothing.
    pub fn empty() -> Self {
        Self {
            gitignore: Gitignore::empty(),
        }
    }

    /// Compile rules from ordered pattern sources.
    ///
    /// Every line of every source is fed to the matcher in order; blank lines
    /// and `#` comments are handled by gitignore semantics. A malformed line is
    /// logged and dropped. Building never fails.
    pub fn from_sources<S: AsRef<str>>(root: &Path, sources: &[Vec<S>]) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        for (source_index, source) in sources.iter().enumerate() {
            for line in source {
                let line = line.as_ref();
                if let Err(e) = builder.add_line(None, line) {
                    warn!(source = source_index, pattern = line, error = %e, "skipping malformed ignore pattern");
                }
            }
        }

        match builder.build() {
            Ok(gitignore) => {
                debug!(rules = gitignore.num_ignores() + gitignore.num_whitelists(), "compiled ignore rules");
                Self { gitignore }
            }
            Err(e) => {
                warn!(error = %e, "failed to compile ignore rules, nothing will be excluded");
                Self::empty()
            }
        }
    }

    /// Whether a file at `path` is excluded.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        self.matched(path.as_ref(), false)
    }

    /// Whether a directory at `path` is excluded.
    ///
    /// Unlike [`IgnoreRules::matches`], directory-only patterns such as
    /// `build/` apply to the path itself.
    pub fn matches_dir(&self, path: impl AsRef<Path>) -> bool {
        self.matched(path.as_ref(), true)
    }

    fn matched(&self, path: &Path, is_dir: bool) -> bool {
        if self.gitignore.is_empty() || path.as_os_str().is_empty() || path.has_root() {
            return false;
        }
        matches!(
            self.gitignore.matched_path_or_any_parents(path, is_dir),
            Match::Ignore(_)
        )
    }

    /// Number of compiled rules (including negations).
    pub fn len(&self) -> usize {
        self.gitignore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gitignore.is_empty()
    }

    /// Whether any `!` rule can re-include a path.
    ///
    /// A re-included file may sit under an excluded directory, so a walk must
    /// not skip excluded directories wholesale while this holds.
    pub fn has_negations(&self) -> bool {
        self.gitignore.num_whitelists() > 0
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read one pattern source as a list of lines.
///
/// The file handle is released on every exit path, including a read error
/// halfway through the file.
pub fn read_pattern_source(path: &Path) -> Result<Vec<String>, PatternSourceError> {
    let to_error = |source| PatternSourceError {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(to_error)?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_error)
}

/// Read pattern sources in order.
///
/// Missing files contribute nothing. Unreadable files are logged and also
/// contribute nothing; the returned list always has one entry per input path
/// so source order is preserved.
pub fn load_pattern_sources(paths: &[PathBuf]) -> Vec<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            if !path.exists() {
                debug!(path = %path.display(), "ignore file not present");
                return Vec::new();
            }
            match read_pattern_source(path) {
                Ok(lines) => {
                    debug!(path = %path.display(), lines = lines.len(), "loaded ignore file");
                    lines
                }
                Err(e) => {
                    warn!("{e}");
                    Vec::new()
                }
            }
        })
        .collect()
}
