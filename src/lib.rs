//! codesum - Summarize a codebase for LLM context.
//!
//! codesum walks a directory tree under layered gitignore-style rules and
//! renders it as a hierarchically numbered outline, then (optionally) asks a
//! completion model to describe the components each script file defines.
//!
//! # Quick Start
//!
//! ```no_run
//! use codesum::builder::Codesum;
//! use codesum::walker::PathBase;
//!
//! let summary = Codesum::new("./my-project")
//!     .base(PathBase::Parent)
//!     .tree()
//!     .unwrap();
//!
//! for line in &summary.lines {
//!     println!("{line}");
//! }
//! ```
//!
//! # Modules
//!
//! - [`ignore_rules`] - Layered gitignore-style matching
//! - [`walker`] - Directory traversal filtered by ignore rules
//! - [`tree`] - Tree building and numbered rendering
//! - [`components`] - Function-name extraction from script files
//! - [`summarize`] - Completion-model summaries
//! - [`builder`] - Fluent API tying it together
//! - [`config`] - Run configuration

pub mod builder;
pub mod components;
pub mod config;
pub mod errors;
pub mod ignore_rules;
pub mod language;
pub mod logging;
pub mod output;
pub mod summarize;
pub mod tokens;
pub mod tree;
pub mod walker;

// Re-export key types at crate root for convenience
pub use builder::{Codesum, SummaryReport, TreeSummary};
pub use components::{ComponentExtractor, ExtractError, NodeScriptExtractor, TreeSitterExtractor};
pub use config::{Config, ConfigError};
pub use errors::CodesumError;
pub use ignore_rules::{IgnoreRules, PatternSourceError};
pub use language::Language;
pub use output::OutputError;
pub use summarize::{
    completion_summarizer, CompletionClient, FileSummary, SummarizeError, Summarizer,
    UnavailableSummarizer,
};
pub use tokens::{ArtifactSize, Encoding};
pub use tree::{NumberedLine, TreeNode};
pub use walker::{PathBase, PathEntry, WalkError, WalkOptions};
