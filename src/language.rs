//! Script language detection.
//!
//! Maps file extensions to the languages the component extractor can parse.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A scripting or programming language with a tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
    Python,
    Go,
    Rust,
}

impl Language {
    /// All supported languages.
    pub fn all() -> &'static [Language] {
        &[
            Language::JavaScript,
            Language::Jsx,
            Language::TypeScript,
            Language::Tsx,
            Language::Python,
            Language::Go,
            Language::Rust,
        ]
    }

    /// File extensions (without the dot) for this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::JavaScript => &["js", "mjs", "cjs"],
            Language::Jsx => &["jsx"],
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
            Language::Python => &["py", "pyi"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
        }
    }

    /// Look up a language by file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_ascii_lowercase();
        Language::all()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::JavaScript => "JavaScript",
            Language::Jsx => "JSX",
            Language::TypeScript => "TypeScript",
            Language::Tsx => "TSX",
            Language::Python => "Python",
            Language::Go => "Go",
            Language::Rust => "Rust",
        };
        f.write_str(name)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "jsx" => Ok(Language::Jsx),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "tsx" => Ok(Language::Tsx),
            "python" | "py" => Ok(Language::Python),
            "go" => Ok(Language::Go),
            "rust" | "rs" => Ok(Language::Rust),
            _ => Err(format!("unknown language: {}", s)),
        }
    }
}

/// Detect the language of a file from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Path::new("src/app.js")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("App.JSX")), Some(Language::Jsx));
        assert_eq!(detect_language(Path::new("main.rs")), Some(Language::Rust));
        assert_eq!(detect_language(Path::new("README.md")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_parse_primary_extension() {
        for lang in Language::all() {
            let parsed: Language = lang.extensions()[0].parse().unwrap();
            assert_eq!(parsed, *lang);
        }
        assert_eq!(Language::Jsx.to_string(), "JSX");
    }

    #[test]
    fn test_unknown_language() {
        assert!("cobol".parse::<Language>().is_err());
    }
}
