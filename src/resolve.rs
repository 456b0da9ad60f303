//! Type reference resolution
//!
//! Turns type expressions found in Go source into [`TypeRef`]s whose
//! qualification is final: builtins and generic parameters stay bare,
//! types of the defining package are emitted bare (or through an import when
//! the scope says so), and foreign types are qualified with an alias taken
//! from the shared [`ImportSet`]. Nested forms keep their qualification at
//! every level.

use crate::error::{Error, Result};
use crate::model::{
    package_name_from_path, ChanDir, FuncType, ImportSet, Location, MethodSignature, Parameter,
    Qualifier, ReturnValue, StructField, TypeParam, TypeRef,
};
use crate::parse::{named_children, parse_tree, Import, Package};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Go's predeclared type names
pub const BUILTIN_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

/// How types declared in the scope's own package are emitted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocalQualifier {
    #[default]
    Unqualified,
    /// Through an import of the package itself
    Imported { path: String, name: String },
}

/// Everything a type expression's meaning depends on
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub package: &'a Package,
    /// Imports of the file the expression appears in
    pub imports: &'a [Import],
    /// Generic parameters visible at this point
    pub type_params: Vec<String>,
    pub local: LocalQualifier,
    /// Import path to the name in the imported package's `package` clause,
    /// for imports without an explicit name
    pub import_names: HashMap<String, String>,
}

impl<'a> Scope<'a> {
    pub fn new(package: &'a Package, imports: &'a [Import]) -> Self {
        Self {
            package,
            imports,
            type_params: Vec::new(),
            local: LocalQualifier::Unqualified,
            import_names: HashMap::new(),
        }
    }

    pub fn with_local(mut self, local: LocalQualifier) -> Self {
        self.local = local;
        self
    }

    pub fn with_import_names(mut self, import_names: HashMap<String, String>) -> Self {
        self.import_names = import_names;
        self
    }

    /// Import a file refers to as `pkg`. Unnamed imports match, in order, by
    /// the imported package's declared name, the name inferred from the path
    /// (`yaml` for `gopkg.in/yaml.v3`), the raw last path segment (`v1` for
    /// `k8s.io/api/core/v1`) and finally a normalized spelling.
    pub fn find_import(&self, pkg: &str) -> Option<&'a Import> {
        let candidates = || self.imports.iter().filter(|i| !i.is_dot() && !i.is_blank());
        let unnamed = || candidates().filter(|i| i.name.is_none());
        candidates()
            .find(|i| i.name.as_deref() == Some(pkg))
            .or_else(|| {
                unnamed().find(|i| self.import_names.get(&i.path).map(String::as_str) == Some(pkg))
            })
            .or_else(|| unnamed().find(|i| package_name_from_path(&i.path) == pkg))
            .or_else(|| unnamed().find(|i| i.path.rsplit('/').next() == Some(pkg)))
            .or_else(|| {
                let wanted = normalize(pkg);
                candidates().find(|i| {
                    i.name.is_none() && normalize(&package_name_from_path(&i.path)) == wanted
                })
            })
    }
}

/// Lower-cased, alphanumerics only, without a leading `go`
fn normalize(name: &str) -> String {
    let lower: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    lower.strip_prefix("go").unwrap_or(&lower).to_string()
}

/// Resolves type expressions of one source text within a [`Scope`]
pub struct Resolver<'s, 'a> {
    scope: &'s Scope<'a>,
    source: &'s str,
    file: PathBuf,
    imports: &'s mut ImportSet,
}

impl<'s, 'a> Resolver<'s, 'a> {
    pub fn new(scope: &'s Scope<'a>, source: &'s str, imports: &'s mut ImportSet) -> Self {
        Self {
            scope,
            source,
            file: PathBuf::new(),
            imports,
        }
    }

    /// File the source text came from, for locations of inline methods
    pub fn with_file(mut self, file: &Path) -> Self {
        self.file = file.to_path_buf();
        self
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Resolve one type expression node
    pub fn resolve(&mut self, node: Node<'_>) -> Result<TypeRef> {
        match node.kind() {
            "type_identifier" | "identifier" => self.identifier(self.text(node), Vec::new()),
            "qualified_type" => self.qualified(node, Vec::new()),
            "generic_type" => self.generic(node),
            "pointer_type" => Ok(TypeRef::pointer(self.resolve(self.only_child(node)?)?)),
            "slice_type" => {
                let elem = self.field(node, "element")?;
                Ok(TypeRef::Slice(Box::new(self.resolve(elem)?)))
            }
            "array_type" | "implicit_length_array_type" => {
                let len = node
                    .child_by_field_name("length")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_else(|| "...".to_string());
                let elem = self.field(node, "element")?;
                Ok(TypeRef::Array {
                    len,
                    elem: Box::new(self.resolve(elem)?),
                })
            }
            "map_type" => {
                let key = self.field(node, "key")?;
                let value = self.field(node, "value")?;
                Ok(TypeRef::Map {
                    key: Box::new(self.resolve(key)?),
                    value: Box::new(self.resolve(value)?),
                })
            }
            "channel_type" => {
                let elem = self.field(node, "value")?;
                Ok(TypeRef::Chan {
                    dir: channel_direction(node),
                    elem: Box::new(self.resolve(elem)?),
                })
            }
            "function_type" => {
                let params = match node.child_by_field_name("parameters") {
                    Some(list) => self.parameters(list)?,
                    None => Vec::new(),
                };
                let results = self.results(node.child_by_field_name("result"))?;
                Ok(TypeRef::Func(FuncType { params, results }))
            }
            "interface_type" => self.inline_interface(node),
            "struct_type" => self.inline_struct(node),
            "parenthesized_type" => self.resolve(self.only_child(node)?),
            "negated_type" => Ok(TypeRef::Approx(Box::new(
                self.resolve(self.only_child(node)?)?,
            ))),
            "type_elem" | "type_constraint" | "constraint_elem" | "union_type" => {
                let mut terms = Vec::new();
                for child in named_children(node) {
                    match self.resolve(child)? {
                        TypeRef::Union(inner) => terms.extend(inner),
                        term => terms.push(term),
                    }
                }
                match terms.len() {
                    0 => Err(Error::unresolvable(self.text(node))),
                    1 => Ok(terms.remove(0)),
                    _ => Ok(TypeRef::Union(terms)),
                }
            }
            _ => Err(Error::unresolvable(self.text(node))),
        }
    }

    /// Resolve a `parameter_list`
    pub fn parameters(&mut self, list: Node<'_>) -> Result<Vec<Parameter>> {
        let mut params = Vec::new();
        for decl in named_children(list) {
            match decl.kind() {
                "parameter_declaration" => {
                    let typ = self.resolve(self.field(decl, "type")?)?;
                    let mut cursor = decl.walk();
                    let names: Vec<String> = decl
                        .children_by_field_name("name", &mut cursor)
                        .map(|n| self.text(n).to_string())
                        .collect();
                    if names.is_empty() {
                        params.push(Parameter {
                            name: String::new(),
                            typ,
                            variadic: false,
                        });
                    } else {
                        for name in names {
                            params.push(Parameter {
                                name,
                                typ: typ.clone(),
                                variadic: false,
                            });
                        }
                    }
                }
                "variadic_parameter_declaration" => {
                    let typ = self.resolve(self.field(decl, "type")?)?;
                    let name = decl
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    params.push(Parameter {
                        name,
                        typ,
                        variadic: true,
                    });
                }
                _ => {}
            }
        }

        if params.iter().rev().skip(1).any(|p| p.variadic) {
            return Err(Error::CodeParse(format!(
                "only the final parameter may be variadic: ({})",
                self.text(list)
            )));
        }
        Ok(params)
    }

    /// Resolve the `result` of a signature: nothing, one bare type, or a list
    pub fn results(&mut self, result: Option<Node<'_>>) -> Result<Vec<ReturnValue>> {
        let Some(result) = result else {
            return Ok(Vec::new());
        };
        if result.kind() != "parameter_list" {
            return Ok(vec![ReturnValue {
                name: String::new(),
                typ: self.resolve(result)?,
            }]);
        }
        let params = self.parameters(result)?;
        if params.iter().any(|p| p.variadic) {
            return Err(Error::CodeParse(format!(
                "result list cannot be variadic: {}",
                self.text(result)
            )));
        }
        Ok(params
            .into_iter()
            .map(|p| ReturnValue {
                name: p.name,
                typ: p.typ,
            })
            .collect())
    }

    /// Resolve a method-like node (`method_elem` or `function_declaration`)
    pub fn signature(
        &mut self,
        name: &str,
        node: Node<'_>,
        location: Location,
    ) -> Result<MethodSignature> {
        let params = match node.child_by_field_name("parameters") {
            Some(list) => self.parameters(list)?,
            None => Vec::new(),
        };
        let results = self.results(node.child_by_field_name("result"))?;
        Ok(MethodSignature {
            name: name.to_string(),
            params,
            results,
            location,
        })
    }

    /// Resolve the constraints of a `type_parameter_list`; the scope must
    /// already list the parameter names.
    pub fn type_params(&mut self, list: Node<'_>) -> Result<Vec<TypeParam>> {
        let mut out = Vec::new();
        for decl in named_children(list) {
            if decl.kind() != "type_parameter_declaration" {
                continue;
            }
            let constraint = self.resolve(self.field(decl, "type")?)?;
            let mut cursor = decl.walk();
            for name in decl.children_by_field_name("name", &mut cursor) {
                out.push(TypeParam {
                    name: self.text(name).to_string(),
                    constraint: constraint.clone(),
                });
            }
        }
        Ok(out)
    }

    fn identifier(&mut self, name: &str, args: Vec<TypeRef>) -> Result<TypeRef> {
        if self.scope.type_params.iter().any(|p| p == name) {
            if !args.is_empty() {
                return Err(Error::unresolvable(name));
            }
            return Ok(TypeRef::param(name));
        }
        if self.scope.package.declares_type(name) {
            let qualifier = match &self.scope.local {
                LocalQualifier::Unqualified => Qualifier::Local,
                LocalQualifier::Imported { path, name: pkg } => Qualifier::Package {
                    alias: self.imports.add(path, pkg),
                    path: path.clone(),
                },
            };
            return Ok(TypeRef::Named {
                qualifier,
                name: name.to_string(),
                args,
            });
        }
        if is_builtin(name) {
            return Ok(TypeRef::Named {
                qualifier: Qualifier::Builtin,
                name: name.to_string(),
                args,
            });
        }

        let mut dots = self.scope.imports.iter().filter(|i| i.is_dot());
        match (dots.next(), dots.next()) {
            (Some(dot), None) => {
                self.imports.add(&dot.path, ".");
                Ok(TypeRef::Named {
                    qualifier: Qualifier::Dot {
                        path: dot.path.clone(),
                    },
                    name: name.to_string(),
                    args,
                })
            }
            _ => Err(Error::unresolvable(name)),
        }
    }

    fn qualified(&mut self, node: Node<'_>, args: Vec<TypeRef>) -> Result<TypeRef> {
        let pkg = self.text(self.field(node, "package")?);
        let name = self.text(self.field(node, "name")?);
        let import = self
            .scope
            .find_import(pkg)
            .ok_or_else(|| Error::unresolvable(self.text(node)))?;
        let preferred = import.name.as_deref().unwrap_or(pkg);
        let alias = self.imports.add(&import.path, preferred);
        Ok(TypeRef::Named {
            qualifier: Qualifier::Package {
                alias,
                path: import.path.clone(),
            },
            name: name.to_string(),
            args,
        })
    }

    fn generic(&mut self, node: Node<'_>) -> Result<TypeRef> {
        let base = self.field(node, "type")?;
        let mut args = Vec::new();
        if let Some(list) = node.child_by_field_name("type_arguments") {
            for arg in named_children(list) {
                args.push(self.resolve(arg)?);
            }
        }
        match base.kind() {
            "type_identifier" | "identifier" => self.identifier(self.text(base), args),
            "qualified_type" => self.qualified(base, args),
            _ => Err(Error::unresolvable(self.text(node))),
        }
    }

    fn inline_interface(&mut self, node: Node<'_>) -> Result<TypeRef> {
        let mut methods = Vec::new();
        let mut embeds = Vec::new();
        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let name = self.text(self.field(elem, "name")?).to_string();
                    let location =
                        Location::new(self.file.clone(), elem.start_position().row + 1);
                    methods.push(self.signature(&name, elem, location)?);
                }
                _ => embeds.push(self.resolve(elem)?),
            }
        }
        Ok(TypeRef::Interface { methods, embeds })
    }

    fn inline_struct(&mut self, node: Node<'_>) -> Result<TypeRef> {
        let mut fields = Vec::new();
        let Some(list) = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Ok(TypeRef::Struct(fields));
        };
        for decl in named_children(list) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let mut typ = self.resolve(self.field(decl, "type")?)?;
            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(n).to_string())
                .collect();
            if names.is_empty() && has_token(decl, "*") {
                typ = TypeRef::pointer(typ);
            }
            let tag = decl
                .child_by_field_name("tag")
                .map(|n| self.text(n).to_string());
            fields.push(StructField { names, typ, tag });
        }
        Ok(TypeRef::Struct(fields))
    }

    fn field<'n>(&self, node: Node<'n>, name: &str) -> Result<Node<'n>> {
        node.child_by_field_name(name)
            .ok_or_else(|| Error::unresolvable(self.text(node)))
    }

    fn only_child<'n>(&self, node: Node<'n>) -> Result<Node<'n>> {
        named_children(node)
            .into_iter()
            .next()
            .ok_or_else(|| Error::unresolvable(self.text(node)))
    }
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token);
    found
}

fn channel_direction(node: Node<'_>) -> ChanDir {
    let mut cursor = node.walk();
    let tokens: Vec<&str> = node
        .children(&mut cursor)
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect();
    match tokens.as_slice() {
        ["<-", "chan", ..] => ChanDir::Recv,
        ["chan", "<-", ..] => ChanDir::Send,
        _ => ChanDir::Both,
    }
}

/// Resolve a type written as text, e.g. `map[string]*io.Reader`, against a
/// scope. The text is parsed on its own, so only the scope's imports and
/// package declarations give it meaning.
pub fn resolve_type_str(raw: &str, scope: &Scope<'_>, imports: &mut ImportSet) -> Result<TypeRef> {
    let source = format!("package p\n\nvar _ {}\n", raw);
    let tree = parse_tree(&source)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::CodeParse(format!("invalid type expression `{}`", raw)));
    }

    let typ = named_children(root)
        .into_iter()
        .find(|n| n.kind() == "var_declaration")
        .and_then(|decl| {
            named_children(decl)
                .into_iter()
                .find(|n| n.kind() == "var_spec")
        })
        .and_then(|spec| spec.child_by_field_name("type"))
        .ok_or_else(|| Error::CodeParse(format!("invalid type expression `{}`", raw)))?;

    Resolver::new(scope, &source, imports).resolve(typ)
}
