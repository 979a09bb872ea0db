//! Artifact writing.
//!
//! Artifacts are plain text files under the output directory, which is
//! created on demand.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::summarize::FileSummary;

/// Errors while writing artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Write `contents` to `path`, creating parent directories first.
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), OutputError> {
    ensure_parent(path)?;

    fs::write(path, contents).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(())
}

/// Write one `path: summary` line per file.
pub fn write_summaries(path: &Path, summaries: &[FileSummary]) -> Result<(), OutputError> {
    let to_write_error = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    ensure_parent(path)?;

    let file = File::create(path).map_err(to_write_error)?;
    let mut out = BufWriter::new(file);
    for summary in summaries {
        writeln!(out, "{summary}").map_err(to_write_error)?;
    }
    out.flush().map_err(to_write_error)?;

    info!(path = %path.display(), files = summaries.len(), "wrote summaries");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::PathEntry;
    use tempfile::TempDir;

    #[test]
    fn test_write_artifact_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summaries/codebase-summary.txt");

        write_artifact(&path, "hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");

        // Overwrites on the next run.
        write_artifact(&path, "again\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "again\n");
    }

    #[test]
    fn test_write_artifact_into_file_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("summaries");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_artifact(&blocker.join("out.txt"), "x").unwrap_err();
        assert!(matches!(err, OutputError::CreateDir { .. }));
    }

    #[test]
    fn test_write_summaries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/code_summaries.txt");
        let summaries = vec![
            FileSummary {
                path: PathEntry::parse("src/a.js").unwrap(),
                components: vec!["a".into()],
                summary: Some("Does a.".into()),
            },
            FileSummary {
                path: PathEntry::parse("src/b.js").unwrap(),
                components: vec![],
                summary: None,
            },
        ];

        write_summaries(&path, &summaries).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "src/a.js: Does a.\nsrc/b.js: (no summary)\n"
        );
    }
}
