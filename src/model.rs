//! Contract model
//!
//! The language-neutral description of an interface that both extraction
//! paths produce and both synthesizers consume. A [`Contract`] is built once
//! per run and never mutated after extraction; every [`TypeRef`] in it is
//! already qualified for the generated file.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// Source position (1-based line)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Extracted model of an interface
#[derive(Debug, Clone, Serialize)]
pub struct Contract {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// Declaration order, embedded contracts flattened ahead of direct methods
    pub methods: Vec<MethodSignature>,
    pub package: PackageContext,
    /// Imports the rendered types rely on
    pub imports: ImportSet,
}

impl Contract {
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// `[K comparable, V any]`, or empty for non-generic contracts
    pub fn type_params_decl(&self) -> String {
        if self.type_params.is_empty() {
            return String::new();
        }
        let params: Vec<String> = self
            .type_params
            .iter()
            .map(|p| format!("{} {}", p.name, p.constraint))
            .collect();
        format!("[{}]", params.join(", "))
    }

    /// `[K, V]`, or empty for non-generic contracts
    pub fn type_args(&self) -> String {
        if self.type_params.is_empty() {
            return String::new();
        }
        let names: Vec<&str> = self.type_params.iter().map(|p| p.name.as_str()).collect();
        format!("[{}]", names.join(", "))
    }
}

/// Qualification context of the package a contract came from
#[derive(Debug, Clone, Serialize)]
pub struct PackageContext {
    /// Name from the `package` clause
    pub name: String,
    pub dir: PathBuf,
    /// Import path when it can be derived from the enclosing module
    pub import_path: Option<String>,
    /// Import alias local types were qualified with, if any
    pub qualifier: Option<String>,
}

/// Generic type parameter of a contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeParam {
    pub name: String,
    pub constraint: TypeRef,
}

/// One contract method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Parameter>,
    pub results: Vec<ReturnValue>,
    pub location: Location,
}

impl MethodSignature {
    /// `Name(params) results`, as written in an interface body
    pub fn prototype(&self) -> String {
        format!(
            "{}({}){}",
            self.name,
            format_params(&self.params),
            format_results(&self.results)
        )
    }

    /// Go method identity: same parameter types (and variadic flag) and
    /// result types. Parameter and result names do not take part.
    pub fn same_signature(&self, other: &MethodSignature) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self.results.len() == other.results.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.variadic == b.variadic && a.typ.to_string() == b.typ.to_string())
            && self
                .results
                .iter()
                .zip(&other.results)
                .all(|(a, b)| a.typ.to_string() == b.typ.to_string())
    }

    pub fn variadic(&self) -> Option<&Parameter> {
        self.params.last().filter(|p| p.variadic)
    }

    pub(crate) fn substitute(&self, subst: &HashMap<String, TypeRef>) -> Self {
        Self {
            name: self.name.clone(),
            params: self
                .params
                .iter()
                .map(|p| Parameter {
                    typ: p.typ.substitute(subst),
                    ..p.clone()
                })
                .collect(),
            results: self
                .results
                .iter()
                .map(|r| ReturnValue {
                    typ: r.typ.substitute(subst),
                    ..r.clone()
                })
                .collect(),
            location: self.location.clone(),
        }
    }
}

/// Method parameter. `typ` is the element type for a variadic parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Empty when the source left it anonymous
    pub name: String,
    pub typ: TypeRef,
    pub variadic: bool,
}

impl Parameter {
    /// Type as written in a parameter list (`...T` for variadics)
    pub fn declared_type(&self) -> String {
        if self.variadic {
            format!("...{}", self.typ)
        } else {
            self.typ.to_string()
        }
    }

    /// Type of the value the callee receives (`[]T` for variadics)
    pub fn value_type(&self) -> TypeRef {
        if self.variadic {
            TypeRef::Slice(Box::new(self.typ.clone()))
        } else {
            self.typ.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnValue {
    /// Empty when the source left it unnamed
    pub name: String,
    pub typ: TypeRef,
}

/// How a named type is qualified in generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Qualifier {
    Builtin,
    /// Declared in the defining package, emitted bare
    Local,
    /// Emitted as `alias.Name`
    Package { alias: String, path: String },
    /// Reached through a dot-import, emitted bare
    Dot { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Resolved, generation-ready type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeRef {
    Named {
        qualifier: Qualifier,
        name: String,
        args: Vec<TypeRef>,
    },
    Param {
        name: String,
    },
    Pointer {
        elem: Box<TypeRef>,
    },
    Slice(Box<TypeRef>),
    Array {
        len: String,
        elem: Box<TypeRef>,
    },
    Map {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<TypeRef>,
    },
    Func(FuncType),
    Interface {
        methods: Vec<MethodSignature>,
        embeds: Vec<TypeRef>,
    },
    Struct(Vec<StructField>),
    Union(Vec<TypeRef>),
    Approx(Box<TypeRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncType {
    pub params: Vec<Parameter>,
    pub results: Vec<ReturnValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructField {
    /// Empty for an embedded field
    pub names: Vec<String>,
    pub typ: TypeRef,
    pub tag: Option<String>,
}

impl TypeRef {
    pub fn builtin(name: &str) -> Self {
        TypeRef::Named {
            qualifier: Qualifier::Builtin,
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn param(name: &str) -> Self {
        TypeRef::Param {
            name: name.to_string(),
        }
    }

    pub fn pointer(elem: TypeRef) -> Self {
        TypeRef::Pointer {
            elem: Box::new(elem),
        }
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, TypeRef::Slice(_))
    }

    /// Replace generic parameters by name
    pub fn substitute(&self, subst: &HashMap<String, TypeRef>) -> TypeRef {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::Param { name } => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Named {
                qualifier,
                name,
                args,
            } => TypeRef::Named {
                qualifier: qualifier.clone(),
                name: name.clone(),
                args: substitute_all(args, subst),
            },
            TypeRef::Pointer { elem } => TypeRef::pointer(elem.substitute(subst)),
            TypeRef::Slice(elem) => TypeRef::Slice(Box::new(elem.substitute(subst))),
            TypeRef::Array { len, elem } => TypeRef::Array {
                len: len.clone(),
                elem: Box::new(elem.substitute(subst)),
            },
            TypeRef::Map { key, value } => TypeRef::Map {
                key: Box::new(key.substitute(subst)),
                value: Box::new(value.substitute(subst)),
            },
            TypeRef::Chan { dir, elem } => TypeRef::Chan {
                dir: *dir,
                elem: Box::new(elem.substitute(subst)),
            },
            TypeRef::Func(func) => TypeRef::Func(FuncType {
                params: func
                    .params
                    .iter()
                    .map(|p| Parameter {
                        typ: p.typ.substitute(subst),
                        ..p.clone()
                    })
                    .collect(),
                results: func
                    .results
                    .iter()
                    .map(|r| ReturnValue {
                        typ: r.typ.substitute(subst),
                        ..r.clone()
                    })
                    .collect(),
            }),
            TypeRef::Interface { methods, embeds } => TypeRef::Interface {
                methods: methods.iter().map(|m| m.substitute(subst)).collect(),
                embeds: substitute_all(embeds, subst),
            },
            TypeRef::Struct(fields) => TypeRef::Struct(
                fields
                    .iter()
                    .map(|f| StructField {
                        typ: f.typ.substitute(subst),
                        ..f.clone()
                    })
                    .collect(),
            ),
            TypeRef::Union(terms) => TypeRef::Union(substitute_all(terms, subst)),
            TypeRef::Approx(inner) => TypeRef::Approx(Box::new(inner.substitute(subst))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named {
                qualifier,
                name,
                args,
            } => {
                match qualifier {
                    Qualifier::Package { alias, .. } if alias != "." => write!(f, "{}.", alias)?,
                    _ => {}
                }
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "[{}]", join(args, ", "))?;
                }
                Ok(())
            }
            TypeRef::Param { name } => write!(f, "{}", name),
            TypeRef::Pointer { elem } => write!(f, "*{}", elem),
            TypeRef::Slice(elem) => write!(f, "[]{}", elem),
            TypeRef::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            TypeRef::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeRef::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
            TypeRef::Func(func) => write!(
                f,
                "func({}){}",
                format_params(&func.params),
                format_results(&func.results)
            ),
            TypeRef::Interface { methods, embeds } => {
                if methods.is_empty() && embeds.is_empty() {
                    return write!(f, "interface{{}}");
                }
                let mut elems: Vec<String> = embeds.iter().map(ToString::to_string).collect();
                elems.extend(methods.iter().map(MethodSignature::prototype));
                write!(f, "interface{{ {} }}", elems.join("; "))
            }
            TypeRef::Struct(fields) => {
                if fields.is_empty() {
                    return write!(f, "struct{{}}");
                }
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        let mut out = if field.names.is_empty() {
                            field.typ.to_string()
                        } else {
                            format!("{} {}", field.names.join(", "), field.typ)
                        };
                        if let Some(tag) = &field.tag {
                            out.push(' ');
                            out.push_str(tag);
                        }
                        out
                    })
                    .collect();
                write!(f, "struct{{ {} }}", rendered.join("; "))
            }
            TypeRef::Union(terms) => write!(f, "{}", join(terms, " | ")),
            TypeRef::Approx(inner) => write!(f, "~{}", inner),
        }
    }
}

fn substitute_all(types: &[TypeRef], subst: &HashMap<String, TypeRef>) -> Vec<TypeRef> {
    types.iter().map(|t| t.substitute(subst)).collect()
}

fn join(types: &[TypeRef], sep: &str) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Render a parameter list body, keeping source names when present
pub fn format_params(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| {
            if p.name.is_empty() {
                p.declared_type()
            } else {
                format!("{} {}", p.name, p.declared_type())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a result list with its leading space: ``, ` T` or ` (A, B)`
pub fn format_results(results: &[ReturnValue]) -> String {
    match results {
        [] => String::new(),
        [only] if only.name.is_empty() => format!(" {}", only.typ),
        _ => {
            let items: Vec<String> = results
                .iter()
                .map(|r| {
                    if r.name.is_empty() {
                        r.typ.to_string()
                    } else {
                        format!("{} {}", r.name, r.typ)
                    }
                })
                .collect();
            format!(" ({})", items.join(", "))
        }
    }
}

/// Imports collected while resolving types for one generated file
///
/// Keyed by import path so iteration (and the rendered import block) is
/// sorted and stable. Aliases are allocated once, at extraction time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSet {
    aliases: BTreeMap<String, String>,
}

/// One line of an import block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportLine {
    pub path: String,
    /// Present when the qualifier differs from the path's package name
    pub alias: Option<String>,
}

impl fmt::Display for ImportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} \"{}\"", alias, self.path),
            None => write!(f, "\"{}\"", self.path),
        }
    }
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path`, preferring `preferred` as its qualifier, and return
    /// the qualifier generated code must use.
    pub fn add(&mut self, path: &str, preferred: &str) -> String {
        if let Some(alias) = self.aliases.get(path) {
            return alias.clone();
        }
        if preferred == "." {
            self.aliases.insert(path.to_string(), ".".to_string());
            return ".".to_string();
        }
        // `arg1` + `2` would read as another positional name
        let sep = if preferred.ends_with(|c: char| c.is_ascii_digit()) {
            "_"
        } else {
            ""
        };
        let mut candidate = preferred.to_string();
        let mut n = 2;
        while self.is_taken(&candidate) || is_reserved(&candidate, path) {
            candidate = format!("{}{}{}", preferred, sep, n);
            n += 1;
        }
        self.aliases.insert(path.to_string(), candidate.clone());
        candidate
    }

    pub fn alias(&self, path: &str) -> Option<&str> {
        self.aliases.get(path).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Import lines sorted by path
    pub fn lines(&self) -> Vec<ImportLine> {
        self.aliases
            .iter()
            .map(|(path, alias)| ImportLine {
                path: path.clone(),
                alias: (alias != &package_name_from_path(path)).then(|| alias.clone()),
            })
            .collect()
    }

    fn is_taken(&self, alias: &str) -> bool {
        self.aliases.values().any(|a| a == alias)
    }
}

/// Identifiers generated code declares itself; an import may not shadow them.
fn is_reserved(alias: &str, path: &str) -> bool {
    const RESERVED: &[&str] = &["fake", "calls", "copy", "make", "len", "append"];
    if RESERVED.contains(&alias) {
        return true;
    }
    if alias == "sync" {
        return path != "sync";
    }
    alias
        .strip_prefix("arg")
        .map(|rest| rest.strip_suffix("Copy").unwrap_or(rest))
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

/// Package name conventionally implied by an import path: the last
/// non-version segment without a `go-` prefix or `.vN` suffix
/// (`gopkg.in/yaml.v3` → `yaml`, `github.com/jackc/pgx/v5` → `pgx`).
pub fn package_name_from_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 && is_major_version(segments[segments.len() - 1]) {
        segments.pop();
    }
    let last = segments.last().copied().unwrap_or(path);
    let last = match last.rsplit_once('.') {
        Some((head, tail)) if is_major_version(tail) => head,
        _ => last,
    };
    let last = last.strip_prefix("go-").unwrap_or(last);
    last.replace(['-', '.'], "_")
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Directory base name, used when deriving names from a source directory
pub fn dir_base_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(alias: &str, path: &str, name: &str) -> TypeRef {
        TypeRef::Named {
            qualifier: Qualifier::Package {
                alias: alias.into(),
                path: path.into(),
            },
            name: name.into(),
            args: vec![],
        }
    }

    #[test]
    fn test_display_nested_foreign_type() {
        let t = TypeRef::pointer(TypeRef::Slice(Box::new(named("io", "io", "Reader"))));
        assert_eq!(t.to_string(), "*[]io.Reader");
    }

    #[test]
    fn test_display_func_and_chan() {
        let t = TypeRef::Func(FuncType {
            params: vec![Parameter {
                name: String::new(),
                typ: TypeRef::builtin("string"),
                variadic: true,
            }],
            results: vec![
                ReturnValue {
                    name: String::new(),
                    typ: TypeRef::builtin("int"),
                },
                ReturnValue {
                    name: String::new(),
                    typ: TypeRef::builtin("error"),
                },
            ],
        });
        assert_eq!(t.to_string(), "func(...string) (int, error)");

        let c = TypeRef::Chan {
            dir: ChanDir::Recv,
            elem: Box::new(TypeRef::Struct(vec![])),
        };
        assert_eq!(c.to_string(), "<-chan struct{}");
    }

    #[test]
    fn test_substitute_generic_param() {
        let t = TypeRef::Map {
            key: Box::new(TypeRef::param("K")),
            value: Box::new(TypeRef::Slice(Box::new(TypeRef::param("V")))),
        };
        let mut subst = HashMap::new();
        subst.insert("K".to_string(), TypeRef::builtin("string"));
        subst.insert("V".to_string(), TypeRef::param("T"));
        assert_eq!(t.substitute(&subst).to_string(), "map[string][]T");
    }

    #[test]
    fn test_import_alias_collision() {
        let mut imports = ImportSet::new();
        assert_eq!(imports.add("errors", "errors"), "errors");
        assert_eq!(imports.add("github.com/pkg/errors", "errors"), "errors2");
        assert_eq!(imports.add("errors", "errors"), "errors");

        let lines: Vec<String> = imports.lines().iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "\"errors\"".to_string(),
                "errors2 \"github.com/pkg/errors\"".to_string()
            ]
        );
    }

    #[test]
    fn test_reserved_aliases() {
        let mut imports = ImportSet::new();
        assert_eq!(imports.add("example.com/fake", "fake"), "fake2");
        assert_eq!(imports.add("example.com/mysync", "sync"), "sync2");
        assert_eq!(imports.add("sync", "sync"), "sync");
        assert_eq!(imports.add("example.com/arg1", "arg1"), "arg1_2");
    }

    #[test]
    fn test_package_name_from_path() {
        assert_eq!(package_name_from_path("io"), "io");
        assert_eq!(package_name_from_path("net/http"), "http");
        assert_eq!(package_name_from_path("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(package_name_from_path("github.com/google/go-cmp/cmp"), "cmp");
        assert_eq!(package_name_from_path("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(package_name_from_path("github.com/mattn/go-sqlite3"), "sqlite3");
    }

    #[test]
    fn test_same_signature_ignores_names() {
        let get = |param: &str, result: &str, variadic: bool| MethodSignature {
            name: "Get".into(),
            params: vec![Parameter {
                name: param.into(),
                typ: TypeRef::builtin("string"),
                variadic,
            }],
            results: vec![ReturnValue {
                name: result.into(),
                typ: TypeRef::builtin("error"),
            }],
            location: Location::new(format!("{}.go", param), 1),
        };
        assert!(get("id", "", false).same_signature(&get("key", "err", false)));
        assert!(!get("id", "", false).same_signature(&get("id", "", true)));

        let mut other = get("id", "", false);
        other.results[0].typ = TypeRef::builtin("bool");
        assert!(!get("id", "", false).same_signature(&other));
    }

    #[test]
    fn test_format_results() {
        let err = ReturnValue {
            name: String::new(),
            typ: TypeRef::builtin("error"),
        };
        assert_eq!(format_results(&[]), "");
        assert_eq!(format_results(std::slice::from_ref(&err)), " error");
        let named = ReturnValue {
            name: "n".into(),
            typ: TypeRef::builtin("int"),
        };
        assert_eq!(format_results(&[named]), " (n int)");
    }
}
