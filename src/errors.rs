//! Error types for codesum.

use crate::config::ConfigError;
use crate::output::OutputError;
use crate::walker::WalkError;

/// Top-level error type for codesum operations.
///
/// Only errors that end a run appear here. Recoverable problems (an
/// unreadable subtree, a failed extraction or summary) are logged where they
/// happen and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum CodesumError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map an error to its exit code.
pub fn exit_code(error: &CodesumError) -> i32 {
    match error {
        CodesumError::Config(_) => 2,
        CodesumError::Walk(e) if e.is_fatal() => 2,
        CodesumError::Walk(_) => 1,
        CodesumError::Output(_) => 1,
        CodesumError::Io(_) => 1,
    }
}
