//! Component extraction: the names a script file defines.
//!
//! Two extractors sit behind [`ComponentExtractor`]:
//!
//! - [`TreeSitterExtractor`] parses the file in-process and collects the name
//!   of every function declaration, at any nesting depth.
//! - [`NodeScriptExtractor`] runs an external `node <script> <file>` and reads
//!   a JSON array of names from its stdout.

mod node;
mod syntax;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::language::{detect_language, Language};

pub use node::NodeScriptExtractor;

/// Errors during component extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported language for file: {path}")]
    UnsupportedLanguage { path: PathBuf },

    #[error("failed to read file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize {language} parser")]
    ParserInit { language: Language },

    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extractor script failed on {path} ({status}): {stderr}")]
    ScriptFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("extractor script produced invalid output for {path}: {source}")]
    InvalidOutput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Extracts component names from a source file.
pub trait ComponentExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

/// In-process extractor backed by tree-sitter grammars.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterExtractor;

impl TreeSitterExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ComponentExtractor for TreeSitterExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let language = detect_language(path).ok_or_else(|| ExtractError::UnsupportedLanguage {
            path: path.to_path_buf(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|source| ExtractError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        extract_names(&content, language).map_err(|e| match e {
            ExtractError::Parse { message, .. } => ExtractError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }
}

/// Collect function declaration names from source text, in source order.
///
/// # Examples
///
/// ```
/// use codesum::components::extract_names;
/// use codesum::language::Language;
///
/// let names = extract_names("function greet() {}", Language::JavaScript).unwrap();
/// assert_eq!(names, vec!["greet"]);
/// ```
pub fn extract_names(content: &str, language: Language) -> Result<Vec<String>, ExtractError> {
    syntax::function_names(content, language)
}
