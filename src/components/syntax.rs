//! Tree-sitter parsing and function-name collection.

use std::cell::RefCell;

use tree_sitter::{Node, Parser};

use super::ExtractError;
use crate::language::Language;

// Thread-local parser caching to avoid re-initialization overhead.
// Grammar loading can fail, so initialization errors are returned, not unwrapped.
thread_local! {
    static RUST_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
    static TS_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
    static TSX_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
    static GO_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_parser(language: tree_sitter::Language) -> Result<Parser, ()> {
    let mut p = Parser::new();
    p.set_language(&language).map_err(|_| ())?;
    Ok(p)
}

fn init_rust_parser() -> Result<Parser, ()> {
    init_parser(tree_sitter_rust::LANGUAGE.into())
}

fn init_ts_parser() -> Result<Parser, ()> {
    init_parser(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
}

fn init_tsx_parser() -> Result<Parser, ()> {
    init_parser(tree_sitter_typescript::LANGUAGE_TSX.into())
}

fn init_python_parser() -> Result<Parser, ()> {
    init_parser(tree_sitter_python::LANGUAGE.into())
}

fn init_go_parser() -> Result<Parser, ()> {
    init_parser(tree_sitter_go::LANGUAGE.into())
}

fn with_cached_parser<F, R>(
    cell: &'static std::thread::LocalKey<RefCell<Option<Parser>>>,
    init: fn() -> Result<Parser, ()>,
    language: Language,
    f: F,
) -> Result<R, ExtractError>
where
    F: FnOnce(&mut Parser) -> R,
{
    cell.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init().map_err(|()| ExtractError::ParserInit { language })?);
        }

        let parser = slot
            .as_mut()
            .ok_or(ExtractError::ParserInit { language })?;
        Ok(f(parser))
    })
}

/// Node kinds that declare a named function, per language.
fn function_kinds(language: Language) -> &'static [&'static str] {
    match language {
        // Plain JavaScript is parsed with the TSX grammar so JSX in `.js`
        // files is understood.
        Language::JavaScript | Language::Jsx | Language::TypeScript | Language::Tsx => {
            &["function_declaration", "generator_function_declaration"]
        }
        Language::Python => &["function_definition"],
        Language::Go => &["function_declaration", "method_declaration"],
        Language::Rust => &["function_item"],
    }
}

pub(super) fn function_names(content: &str, language: Language) -> Result<Vec<String>, ExtractError> {
    let kinds = function_kinds(language);
    let collect = |parser: &mut Parser| -> Result<Vec<String>, ExtractError> {
        let tree = parser.parse(content, None).ok_or_else(|| ExtractError::Parse {
            path: Default::default(),
            message: "failed to parse".to_string(),
        })?;

        let mut names = Vec::new();
        collect_names(tree.root_node(), content, kinds, &mut names);
        Ok(names)
    };

    match language {
        Language::Rust => with_cached_parser(&RUST_PARSER, init_rust_parser, language, collect)?,
        Language::TypeScript => with_cached_parser(&TS_PARSER, init_ts_parser, language, collect)?,
        Language::JavaScript | Language::Jsx | Language::Tsx => {
            with_cached_parser(&TSX_PARSER, init_tsx_parser, language, collect)?
        }
        Language::Python => with_cached_parser(&PYTHON_PARSER, init_python_parser, language, collect)?,
        Language::Go => with_cached_parser(&GO_PARSER, init_go_parser, language, collect)?,
    }
}

/// Pre-order walk collecting the `name` field of every matching node.
fn collect_names(node: Node, content: &str, kinds: &[&str], names: &mut Vec<String>) {
    if kinds.contains(&node.kind()) {
        if let Some(name) = node.child_by_field_name("name") {
            names.push(content[name.byte_range()].to_string());
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_names(child, content, kinds, names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_javascript_nested_and_exported() {
        let code = r#"
export function outer() {
    function inner() {}
    return inner;
}

export function* gen() {}

const arrow = () => 1;
class Widget {
    render() {}
}
"#;
        let names = function_names(code, Language::JavaScript).unwrap();
        assert_eq!(names, vec!["outer", "inner", "gen"]);
    }

    #[test]
    fn test_anonymous_default_export_is_skipped() {
        let names = function_names("export default function () {}", Language::JavaScript).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_typescript() {
        let code = "export function parse(input: string): number { return 1; }";
        let names = function_names(code, Language::TypeScript).unwrap();
        assert_eq!(names, vec!["parse"]);
    }

    #[test]
    fn test_python() {
        let code = r#"
def top():
    pass

class Service:
    def handle(self):
        pass
"#;
        let names = function_names(code, Language::Python).unwrap();
        assert_eq!(names, vec!["top", "handle"]);
    }

    #[test]
    fn test_go() {
        let code = r#"
package main

func main() {}

func (s *Server) Start() error { return nil }
"#;
        let names = function_names(code, Language::Go).unwrap();
        assert_eq!(names, vec!["main", "Start"]);
    }

    #[test]
    fn test_rust() {
        let code = r#"
pub fn public() {}
impl Thing {
    fn method(&self) {}
}
"#;
        let names = function_names(code, Language::Rust).unwrap();
        assert_eq!(names, vec!["public", "method"]);
    }

    #[test]
    fn test_no_functions() {
        let names = function_names("const x = 1;", Language::JavaScript).unwrap();
        assert!(names.is_empty());
    }
}
