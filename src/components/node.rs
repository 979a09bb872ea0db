//! Component extraction through an external script.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::{ComponentExtractor, ExtractError};

/// Runs `<program> <script> <file>` and parses stdout as a JSON array of names.
///
/// The default program is `node`; the script is expected to print something
/// like `["App","helper"]`.
#[derive(Debug, Clone)]
pub struct NodeScriptExtractor {
    program: String,
    script: PathBuf,
}

impl NodeScriptExtractor {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            program: "node".to_string(),
            script: script.into(),
        }
    }

    /// Use a different interpreter.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl ComponentExtractor for NodeScriptExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let output = Command::new(&self.program)
            .arg(&self.script)
            .arg(path)
            .output()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(path = %path.display(), %stdout, %stderr, "extractor script finished");

        if !output.status.success() {
            return Err(ExtractError::ScriptFailed {
                path: path.to_path_buf(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        serde_json::from_str(stdout.trim()).map_err(|source| ExtractError::InvalidOutput {
            path: path.to_path_buf(),
            source,
        })
    }
}
