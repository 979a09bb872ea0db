//! File tree representation and numbered rendering.
//!
//! A flat list of relative paths is folded into a [`TreeNode`], which renders
//! as indented lines carrying a hierarchical dotted index:
//!
//! ```text
//! - readme.md (1)
//! - src/ (2)
//!   |_ a.js (2.1)
//!   |_ sub/ (2.2)
//!     |_ b.js (2.2.1)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::walker::PathEntry;

/// Legend written above the rendered tree.
pub const LEGEND: [&str; 3] = [
    "This is a directory tree of the codebase, each item has a unique numbering scheme:",
    "- Directories are indicated by a trailing slash and have format (x) or (x.y)",
    "- Files are located inside directories and have format (x.y.z)",
];

const INDENT: &str = "  ";
const ROOT_BULLET: &str = "- ";
const NESTED_BULLET: &str = "|_ ";
const DIR_MARKER: char = '/';

/// A node in the file tree.
///
/// Children are keyed by path segment and kept in byte-lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory(BTreeMap<String, TreeNode>),
    File,
}

impl Default for TreeNode {
    fn default() -> Self {
        TreeNode::Directory(BTreeMap::new())
    }
}

impl TreeNode {
    /// An empty root directory.
    pub fn root() -> Self {
        Self::default()
    }

    /// Fold relative paths into a tree.
    ///
    /// The result does not depend on the order of `paths`.
    ///
    /// # Examples
    ///
    /// ```
    /// use codesum::tree::TreeNode;
    /// use codesum::walker::PathEntry;
    ///
    /// let paths = ["src/a.js", "readme.md"].map(|p| PathEntry::parse(p).unwrap());
    /// let tree = TreeNode::from_paths(&paths);
    /// assert_eq!(tree.file_count(), 2);
    /// assert_eq!(tree.directory_count(), 1);
    /// ```
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a PathEntry>,
    {
        let mut root = Self::root();
        for path in paths {
            root.insert(path);
        }
        root
    }

    /// Insert one path below this node.
    ///
    /// A segment previously recorded as a file becomes a directory once a
    /// deeper path runs through it; a directory is never turned back into a
    /// file.
    pub fn insert(&mut self, path: &PathEntry) {
        let segments: Vec<&str> = path.segments().collect();
        self.insert_segments(&segments);
    }

    fn insert_segments(&mut self, segments: &[&str]) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };

        if self.is_file() {
            *self = TreeNode::root();
        }

        if let TreeNode::Directory(children) = self {
            let child = children.entry((*first).to_string()).or_insert_with(|| {
                if rest.is_empty() {
                    TreeNode::File
                } else {
                    TreeNode::root()
                }
            });
            child.insert_segments(rest);
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, TreeNode::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, TreeNode::File)
    }

    /// Whether this node has no children (files are always empty).
    pub fn is_empty(&self) -> bool {
        match self {
            TreeNode::Directory(children) => children.is_empty(),
            TreeNode::File => true,
        }
    }

    /// Child nodes in rendering order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &TreeNode)> {
        let children = match self {
            TreeNode::Directory(children) => Some(children.iter()),
            TreeNode::File => None,
        };
        children
            .into_iter()
            .flatten()
            .map(|(name, node)| (name.as_str(), node))
    }

    /// Count files in this tree.
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::File => 1,
            TreeNode::Directory(children) => children.values().map(|c| c.file_count()).sum(),
        }
    }

    /// Count directories below this node (the node itself excluded).
    pub fn directory_count(&self) -> usize {
        self.children()
            .filter(|(_, child)| child.is_directory())
            .map(|(_, child)| 1 + child.directory_count())
            .sum()
    }

    /// Every root-to-leaf path, `/`-separated.
    pub fn leaf_paths(&self) -> Vec<String> {
        fn collect(node: &TreeNode, prefix: &str, out: &mut Vec<String>) {
            for (name, child) in node.children() {
                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                };
                if child.is_empty() {
                    out.push(path);
                } else {
                    collect(child, &path, out);
                }
            }
        }

        let mut out = Vec::new();
        collect(self, "", &mut out);
        out
    }
}

/// One rendered tree line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberedLine {
    /// Nesting depth; root-level entries are at depth 0.
    pub depth: usize,
    /// Dotted hierarchical index such as `2.2.1`.
    pub index: String,
    /// Path segment.
    pub name: String,
    pub is_directory: bool,
}

impl fmt::Display for NumberedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str(INDENT)?;
        }
        f.write_str(if self.depth == 0 { ROOT_BULLET } else { NESTED_BULLET })?;
        f.write_str(&self.name)?;
        if self.is_directory {
            write!(f, "{DIR_MARKER}")?;
        }
        write!(f, " ({})", self.index)
    }
}

/// Render a tree as numbered lines, depth-first in pre-order.
///
/// Siblings are numbered `1..=N` in key order; a child's index is its
/// parent's index plus one dotted segment.
pub fn render(tree: &TreeNode) -> Vec<NumberedLine> {
    let mut lines = Vec::new();
    render_node(&mut lines, tree, 0, "");
    lines
}

fn render_node(lines: &mut Vec<NumberedLine>, node: &TreeNode, depth: usize, parent_index: &str) {
    for (i, (name, child)) in node.children().enumerate() {
        let index = if parent_index.is_empty() {
            (i + 1).to_string()
        } else {
            format!("{}.{}", parent_index, i + 1)
        };

        // An empty directory only arises from conflicting inserts and renders
        // as a leaf, the same as a file.
        let is_directory = !child.is_empty();

        lines.push(NumberedLine {
            depth,
            index: index.clone(),
            name: name.to_string(),
            is_directory,
        });

        if is_directory {
            render_node(lines, child, depth + 1, &index);
        }
    }
}

/// Render a tree to display strings.
pub fn render_lines(tree: &TreeNode) -> Vec<String> {
    render(tree).iter().map(ToString::to_string).collect()
}

/// Render the full artifact: legend, a blank line, then one line per entry.
pub fn render_document(tree: &TreeNode) -> String {
    let mut output = String::with_capacity(4096);
    for line in LEGEND {
        output.push_str(line);
        output.push('\n');
    }
    output.push('\n');
    for line in render(tree) {
        output.push_str(&line.to_string());
        output.push('\n');
    }
    output
}
