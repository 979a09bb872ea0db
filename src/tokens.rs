//! Size of generated artifacts.
//!
//! The tree artifact is meant to be pasted into a model's context, so its
//! size is reported in tokens alongside lines and bytes. Counting uses
//! tiktoken-rs and degrades to a length estimate if the encoding tables cannot
//! be loaded.

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Token encoding to count with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Encoding {
    /// GPT-3.5 and GPT-4 family.
    #[default]
    #[serde(rename = "cl100k_base")]
    Cl100kBase,
    /// GPT-4o family.
    #[serde(rename = "o200k_base")]
    O200kBase,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Cl100kBase => "cl100k_base",
            Encoding::O200kBase => "o200k_base",
        })
    }
}

fn encoder(encoding: Encoding) -> Option<&'static CoreBPE> {
    static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
    static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

    match encoding {
        Encoding::Cl100kBase => CL100K.get_or_init(|| loaded(encoding, tiktoken_rs::cl100k_base())),
        Encoding::O200kBase => O200K.get_or_init(|| loaded(encoding, tiktoken_rs::o200k_base())),
    }
    .as_ref()
}

fn loaded<E: fmt::Display>(encoding: Encoding, result: Result<CoreBPE, E>) -> Option<CoreBPE> {
    result
        .map_err(|e| warn!(%encoding, "token tables unavailable, estimating sizes: {e}"))
        .ok()
}

/// Roughly four bytes per token.
fn estimate(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Count tokens in `text`. Never fails.
///
/// # Examples
///
/// ```
/// use codesum::tokens::{count_tokens, Encoding};
///
/// assert!(count_tokens("- src/ (1)", Encoding::Cl100kBase) > 0);
/// ```
pub fn count_tokens(text: &str, encoding: Encoding) -> usize {
    match encoder(encoding) {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => estimate(text),
    }
}

/// Lines, bytes and tokens of a rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArtifactSize {
    pub lines: usize,
    pub bytes: usize,
    pub tokens: usize,
    pub encoding: Encoding,
}

impl ArtifactSize {
    pub fn measure(text: &str, encoding: Encoding) -> Self {
        Self {
            lines: text.lines().count(),
            bytes: text.len(),
            tokens: count_tokens(text, encoding),
            encoding,
        }
    }
}

impl fmt::Display for ArtifactSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines, {} tokens ({})",
            self.lines, self.tokens, self.encoding
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{render_document, TreeNode};
    use crate::walker::PathEntry;

    fn document(paths: &[&str]) -> String {
        let entries: Vec<_> = paths.iter().filter_map(|p| PathEntry::parse(p)).collect();
        render_document(&TreeNode::from_paths(&entries))
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(count_tokens("", Encoding::default()), 0);
    }

    #[test]
    fn test_document_grows_with_tree() {
        let empty = document(&[]);
        let full = document(&["src/a.js", "src/b.js", "readme.md"]);

        for encoding in [Encoding::Cl100kBase, Encoding::O200kBase] {
            assert!(count_tokens(&full, encoding) > count_tokens(&empty, encoding));
        }
    }

    #[test]
    fn test_measure_legend_only_document() {
        let size = ArtifactSize::measure(&document(&[]), Encoding::O200kBase);

        // Three legend lines and the blank separator.
        assert_eq!(size.lines, 4);
        assert!(size.tokens > 0);
        assert!(size.tokens <= size.bytes);
        assert_eq!(size.encoding, Encoding::O200kBase);
        assert!(size.to_string().ends_with("(o200k_base)"));
    }

    #[test]
    fn test_size_serializes_encoding_name() {
        let size = ArtifactSize::measure("- a.js (1)\n", Encoding::Cl100kBase);
        let json = serde_json::to_value(size).unwrap();

        assert_eq!(json["encoding"], "cl100k_base");
        assert_eq!(json["lines"], 1);
        assert_eq!(json["bytes"], 11);
    }

    #[test]
    fn test_estimate() {
        assert_eq!(estimate(""), 0);
        assert_eq!(estimate("a"), 1);
        assert_eq!(estimate("abcd"), 1);
        assert_eq!(estimate("abcde"), 2);
    }
}
