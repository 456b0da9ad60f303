//! Go parser - parses one Go source file with tree-sitter
//!
//! Only the top level of a file is interpreted here (package clause,
//! imports, type and function declarations). Type expressions are handed
//! to the resolver as raw nodes.

use crate::error::{Error, Result};
use crate::model::Location;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// An import spec of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Explicit name: an alias, `.` or `_`
    pub name: Option<String>,
    pub path: String,
    pub line: usize,
}

impl Import {
    pub fn is_dot(&self) -> bool {
        self.name.as_deref() == Some(".")
    }

    pub fn is_blank(&self) -> bool {
        self.name.as_deref() == Some("_")
    }
}

/// A parsed Go source file
pub struct GoFile {
    pub path: PathBuf,
    pub source: String,
    tree: Tree,
    pub package: String,
    pub imports: Vec<Import>,
}

impl std::fmt::Debug for GoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoFile")
            .field("path", &self.path)
            .field("package", &self.package)
            .field("imports", &self.imports)
            .finish()
    }
}

impl GoFile {
    /// Read and parse a file from disk
    pub fn read(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, source)
    }

    pub fn parse(path: impl Into<PathBuf>, source: String) -> Result<Self> {
        let path = path.into();
        let tree = parse_tree(&source)?;

        let mut file = GoFile {
            path,
            source,
            tree,
            package: String::new(),
            imports: Vec::new(),
        };
        file.package = file.read_package_clause();
        file.imports = file.read_imports();

        if let Some(at) = file.first_error(file.root()) {
            tracing::warn!(location = %at, "syntax error in Go source");
        }
        Ok(file)
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    pub fn location(&self, node: Node<'_>) -> Location {
        Location::new(self.path.clone(), node.start_position().row + 1)
    }

    /// Location of the first syntax error at or below `node`
    pub fn first_error(&self, node: Node<'_>) -> Option<Location> {
        if !node.has_error() {
            return None;
        }
        if node.is_error() || node.is_missing() {
            return Some(self.location(node));
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        children
            .into_iter()
            .find_map(|child| self.first_error(child))
            .or_else(|| Some(self.location(node)))
    }

    /// Top-level `type_spec` and `type_alias` nodes in declaration order,
    /// including those inside grouped `type ( ... )` declarations
    pub fn type_specs(&self) -> Vec<Node<'_>> {
        let mut specs = Vec::new();
        for decl in named_children(self.root()) {
            if decl.kind() != "type_declaration" {
                continue;
            }
            for spec in named_children(decl) {
                if matches!(spec.kind(), "type_spec" | "type_alias") {
                    specs.push(spec);
                }
            }
        }
        specs
    }

    /// Name of a `type_spec` / `type_alias`
    pub fn spec_name<'a>(&'a self, spec: Node<'a>) -> &'a str {
        spec.child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or("")
    }

    /// Top-level `func` declarations (methods excluded) in declaration order
    pub fn functions(&self) -> Vec<Node<'_>> {
        named_children(self.root())
            .into_iter()
            .filter(|n| n.kind() == "function_declaration")
            .collect()
    }

    fn read_package_clause(&self) -> String {
        named_children(self.root())
            .into_iter()
            .find(|n| n.kind() == "package_clause")
            .and_then(|clause| {
                named_children(clause)
                    .into_iter()
                    .find(|n| n.kind() == "package_identifier")
            })
            .map(|n| self.text(n).to_string())
            .unwrap_or_default()
    }

    fn read_imports(&self) -> Vec<Import> {
        let mut imports = Vec::new();
        for decl in named_children(self.root()) {
            if decl.kind() != "import_declaration" {
                continue;
            }
            for child in named_children(decl) {
                match child.kind() {
                    "import_spec" => imports.extend(self.read_import_spec(child)),
                    "import_spec_list" => {
                        for spec in named_children(child) {
                            if spec.kind() == "import_spec" {
                                imports.extend(self.read_import_spec(spec));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        imports
    }

    fn read_import_spec(&self, spec: Node<'_>) -> Option<Import> {
        let path = spec.child_by_field_name("path")?;
        let path = unquote(self.text(path));
        if path.is_empty() {
            return None;
        }
        let name = spec
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string());
        Some(Import {
            name,
            path,
            line: spec.start_position().row + 1,
        })
    }
}

/// Parse Go source into a tree-sitter tree
pub(crate) fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| Error::CodeParse(format!("Failed to set language: {}", e)))?;

    parser
        .parse(source, None)
        .ok_or_else(|| Error::CodeParse("Failed to parse source".into()))
}

/// Named children of a node, comments skipped
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Strip Go string literal quotes (interpreted or raw)
pub(crate) fn unquote(literal: &str) -> String {
    literal
        .trim()
        .trim_matches(|c| c == '"' || c == '`')
        .to_string()
}

/// Exported Go identifiers start with an upper-case letter
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"package store

import (
	"context"
	kv "example.com/kv"
	. "example.com/dot"
	_ "embed"
)

import "io"

type (
	Key string
	Store interface {
		Get(ctx context.Context, key Key) ([]byte, error)
	}
)

type Alias = Store

func Open(path string) (*Store, error) { return nil, nil }

func (k Key) String() string { return string(k) }

func helper() {}
"#;

    fn file() -> GoFile {
        GoFile::parse("store.go", SOURCE.to_string()).unwrap()
    }

    #[test]
    fn test_package_clause() {
        assert_eq!(file().package, "store");
    }

    #[test]
    fn test_imports() {
        let f = file();
        let paths: Vec<&str> = f.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["context", "example.com/kv", "example.com/dot", "embed", "io"]
        );
        assert_eq!(f.imports[1].name.as_deref(), Some("kv"));
        assert!(f.imports[2].is_dot());
        assert!(f.imports[3].is_blank());
        assert_eq!(f.imports[4].line, 10);
    }

    #[test]
    fn test_type_specs_in_order() {
        let f = file();
        let names: Vec<&str> = f.type_specs().into_iter().map(|s| f.spec_name(s)).collect();
        assert_eq!(names, vec!["Key", "Store", "Alias"]);
    }

    #[test]
    fn test_functions_skip_methods() {
        let f = file();
        let names: Vec<String> = f
            .functions()
            .into_iter()
            .filter_map(|n| n.child_by_field_name("name"))
            .map(|n| f.text(n).to_string())
            .collect();
        assert_eq!(names, vec!["Open", "helper"]);
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("Open"));
        assert!(!is_exported("helper"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_first_error_reports_line() {
        let f = GoFile::parse("bad.go", "package bad\n\ntype X interface {\n\tFoo(\n}\n".into())
            .unwrap();
        let at = f.first_error(f.root()).expect("syntax error expected");
        assert!(at.line >= 3, "unexpected location {}", at);
    }
}
