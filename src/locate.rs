//! Contract Locator
//!
//! Finds a named interface in a Go file or package directory and flattens
//! everything it embeds into one ordered method list.
//!
//! Flattening rules:
//! - embedded methods come first, in embedding order, then the methods
//!   declared directly on the interface
//! - a direct method overrides an embedded one of the same name and keeps
//!   its own position
//! - two embeds contributing the same method must agree on its signature
//! - an interface that reaches itself through embedding is an error

use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::PackageLoader;
use crate::model::{Contract, ImportSet, MethodSignature, PackageContext, ReturnValue, TypeRef};
use crate::parse::{named_children, GoFile, Package};
use crate::resolve::{is_builtin, LocalQualifier, Resolver, Scope};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tree_sitter::Node;

/// Locate `name` in `source_path` with a loader that only searches the
/// enclosing module and the environment's GOPATH/GOROOT
pub fn locate(name: &str, source_path: &Path) -> Result<Contract> {
    Locator::new(PackageLoader::new(&Config::default())).locate(name, source_path)
}

/// One interface on the current embedding path
#[derive(Debug, Clone)]
struct Link {
    dir: PathBuf,
    name: String,
    /// Name as written at the embedding site (`io.Reader`)
    display: String,
}

/// Contract Locator
pub struct Locator {
    loader: PackageLoader,
    qualify_local_types: bool,
}

impl Locator {
    pub fn new(loader: PackageLoader) -> Self {
        Self {
            loader,
            qualify_local_types: false,
        }
    }

    /// Qualify types of the defining package through its import path, for
    /// fakes generated into another package
    pub fn with_qualified_local_types(mut self, qualify: bool) -> Self {
        self.qualify_local_types = qualify;
        self
    }

    /// Locate the interface `name` in a file or directory
    pub fn locate(&mut self, name: &str, source_path: &Path) -> Result<Contract> {
        let (package, only) = if source_path.is_file() {
            (self.loader.load_file(source_path)?, Some(source_path))
        } else {
            (self.loader.load_dir(source_path)?, None)
        };

        let searched: Vec<&GoFile> = match only {
            Some(path) => package.file(path).into_iter().collect(),
            None => package.files.iter().collect(),
        };

        let mut candidates = Vec::new();
        for file in searched {
            for spec in file.type_specs() {
                if file.spec_name(spec) == name {
                    candidates.push((file, spec));
                }
            }
        }

        let (file, spec) = match candidates.as_slice() {
            [] => {
                return Err(Error::NotFound {
                    name: name.to_string(),
                    path: source_path.to_path_buf(),
                })
            }
            [only] => *only,
            many => {
                return Err(Error::Ambiguous {
                    name: name.to_string(),
                    locations: many.iter().map(|(f, s)| f.location(*s)).collect(),
                })
            }
        };
        tracing::debug!(
            contract = %name,
            location = %file.location(spec),
            "located interface"
        );

        let local = match (&package.import_path, self.qualify_local_types) {
            (Some(path), true) => LocalQualifier::Imported {
                path: path.clone(),
                name: package.name.clone(),
            },
            (None, true) => {
                tracing::warn!(
                    dir = %package.dir.display(),
                    "no go.mod or GOPATH root above the package; local types stay unqualified"
                );
                LocalQualifier::Unqualified
            }
            _ => LocalQualifier::Unqualified,
        };

        let mut imports = ImportSet::new();
        let import_names = self.loader.import_names(&package.dir, &file.imports);
        let mut scope = Scope::new(&package, &file.imports)
            .with_local(local.clone())
            .with_import_names(import_names);
        let mut type_params = Vec::new();
        if let Some(list) = spec.child_by_field_name("type_parameters") {
            scope.type_params = type_param_names(file, list);
            type_params = Resolver::new(&scope, &file.source, &mut imports)
                .with_file(&file.path)
                .type_params(list)?;
        }

        let mut chain = vec![Link {
            dir: package.dir.clone(),
            name: name.to_string(),
            display: name.to_string(),
        }];
        let methods = self.spec_methods(&scope, file, spec, &mut imports, &mut chain)?;

        // needed by the fake's compile-time assertion
        if let (LocalQualifier::Imported { path, name: pkg }, true) = (&local, type_params.is_empty())
        {
            imports.add(path, pkg);
        }
        let qualifier = match &local {
            LocalQualifier::Imported { path, .. } => imports.alias(path).map(str::to_string),
            LocalQualifier::Unqualified => None,
        };
        tracing::debug!(
            contract = %name,
            methods = methods.len(),
            imports = imports.len(),
            "flattened contract"
        );

        Ok(Contract {
            name: name.to_string(),
            type_params,
            methods,
            package: PackageContext {
                name: package.name.clone(),
                dir: package.dir.clone(),
                import_path: package.import_path.clone(),
                qualifier,
            },
            imports,
        })
    }

    /// Methods of a `type_spec` or `type_alias`
    fn spec_methods(
        &mut self,
        scope: &Scope<'_>,
        file: &GoFile,
        spec: Node<'_>,
        imports: &mut ImportSet,
        chain: &mut Vec<Link>,
    ) -> Result<Vec<MethodSignature>> {
        if let Some(at) = file.first_error(spec) {
            return Err(Error::CodeParse(format!(
                "syntax error in declaration of `{}` at {}",
                file.spec_name(spec),
                at
            )));
        }
        let typ = spec.child_by_field_name("type").ok_or_else(|| {
            Error::CodeParse(format!("type `{}` has no definition", file.spec_name(spec)))
        })?;

        if spec.kind() == "type_alias" {
            return self.embedded(scope, file, typ, imports, chain);
        }
        if typ.kind() != "interface_type" {
            return Err(Error::NotAnInterface {
                name: file.spec_name(spec).to_string(),
                location: file.location(spec),
            });
        }
        self.interface_body(scope, file, typ, imports, chain)
    }

    fn interface_body(
        &mut self,
        scope: &Scope<'_>,
        file: &GoFile,
        node: Node<'_>,
        imports: &mut ImportSet,
        chain: &mut Vec<Link>,
    ) -> Result<Vec<MethodSignature>> {
        let owner = owner(chain);
        let mut inherited: Vec<MethodSignature> = Vec::new();
        let mut conflicts: Vec<String> = Vec::new();
        let mut direct: Vec<MethodSignature> = Vec::new();

        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let name = elem
                        .child_by_field_name("name")
                        .map(|n| file.text(n).to_string())
                        .unwrap_or_default();
                    if direct.iter().any(|m| m.name == name) {
                        return Err(Error::DuplicateMethodName {
                            contract: owner,
                            method: name,
                        });
                    }
                    let location = file.location(elem);
                    let method = Resolver::new(scope, &file.source, imports)
                        .with_file(&file.path)
                        .signature(&name, elem, location.clone())
                        .map_err(|e| e.in_method(&name, &location))?;
                    direct.push(method);
                }
                _ => {
                    for method in self.embedded(scope, file, elem, imports, chain)? {
                        match inherited.iter().find(|m| m.name == method.name) {
                            Some(existing) if existing.same_signature(&method) => {}
                            Some(_) => conflicts.push(method.name),
                            None => inherited.push(method),
                        }
                    }
                }
            }
        }

        if let Some(method) = conflicts
            .into_iter()
            .find(|name| !direct.iter().any(|m| &m.name == name))
        {
            return Err(Error::DuplicateMethodName {
                contract: owner,
                method,
            });
        }

        inherited.retain(|m| !direct.iter().any(|d| d.name == m.name));
        inherited.extend(direct);
        Ok(inherited)
    }

    /// Methods contributed by one embedded element
    fn embedded(
        &mut self,
        scope: &Scope<'_>,
        file: &GoFile,
        node: Node<'_>,
        imports: &mut ImportSet,
        chain: &mut Vec<Link>,
    ) -> Result<Vec<MethodSignature>> {
        match node.kind() {
            "type_elem" | "constraint_elem" | "interface_type_name" => {
                match named_children(node).as_slice() {
                    [term] => self.embedded(scope, file, *term, imports, chain),
                    _ => Err(type_set(chain)),
                }
            }
            "parenthesized_type" => match named_children(node).first() {
                Some(inner) => self.embedded(scope, file, *inner, imports, chain),
                None => Err(Error::unresolvable(file.text(node))),
            },
            "interface_type" => self.interface_body(scope, file, node, imports, chain),
            "type_identifier" => self.embedded_ident(scope, file, node, Vec::new(), imports, chain),
            "qualified_type" => {
                self.embedded_foreign(scope, file, node, Vec::new(), imports, chain)
            }
            "generic_type" => {
                let base = node
                    .child_by_field_name("type")
                    .ok_or_else(|| Error::unresolvable(file.text(node)))?;
                let mut args = Vec::new();
                if let Some(list) = node.child_by_field_name("type_arguments") {
                    let mut resolver =
                        Resolver::new(scope, &file.source, imports).with_file(&file.path);
                    for arg in named_children(list) {
                        args.push(resolver.resolve(arg)?);
                    }
                }
                match base.kind() {
                    "qualified_type" => {
                        self.embedded_foreign(scope, file, base, args, imports, chain)
                    }
                    _ => self.embedded_ident(scope, file, base, args, imports, chain),
                }
            }
            "negated_type" | "union_type" => Err(type_set(chain)),
            _ => Err(Error::Unsupported {
                name: owner(chain),
                reason: format!("embeds non-interface type `{}`", file.text(node)),
            }),
        }
    }

    fn embedded_ident(
        &mut self,
        scope: &Scope<'_>,
        file: &GoFile,
        node: Node<'_>,
        args: Vec<TypeRef>,
        imports: &mut ImportSet,
        chain: &mut Vec<Link>,
    ) -> Result<Vec<MethodSignature>> {
        let ident = file.text(node);

        if scope.type_params.iter().any(|p| p == ident) {
            return Err(Error::Unsupported {
                name: owner(chain),
                reason: format!("embeds type parameter `{}`", ident),
            });
        }
        if scope.package.declares_type(ident) {
            let package = PackageRef::Borrowed(scope.package);
            return self.named(&package, scope.local.clone(), ident, ident, args, imports, chain);
        }
        match ident {
            "error" => {
                return Ok(vec![MethodSignature {
                    name: "Error".to_string(),
                    params: Vec::new(),
                    results: vec![ReturnValue {
                        name: String::new(),
                        typ: TypeRef::builtin("string"),
                    }],
                    location: file.location(node),
                }])
            }
            "any" => return Ok(Vec::new()),
            "comparable" => return Err(type_set(chain)),
            other if is_builtin(other) => {
                return Err(Error::Unsupported {
                    name: owner(chain),
                    reason: format!("embeds non-interface type `{}`", other),
                })
            }
            _ => {}
        }

        let mut dots = scope.imports.iter().filter(|i| i.is_dot());
        let (Some(dot), None) = (dots.next(), dots.next()) else {
            return Err(Error::unresolvable(ident));
        };
        let Some(foreign) = self.loader.import(&scope.package.dir, &dot.path)? else {
            return Err(Error::unresolvable(ident));
        };
        imports.add(&dot.path, ".");
        let local = LocalQualifier::Imported {
            path: dot.path.clone(),
            name: ".".to_string(),
        };
        self.named(&PackageRef::Shared(foreign), local, ident, ident, args, imports, chain)
    }

    fn embedded_foreign(
        &mut self,
        scope: &Scope<'_>,
        file: &GoFile,
        node: Node<'_>,
        args: Vec<TypeRef>,
        imports: &mut ImportSet,
        chain: &mut Vec<Link>,
    ) -> Result<Vec<MethodSignature>> {
        let qualified = file.text(node);
        let (pkg, name) = match (
            node.child_by_field_name("package"),
            node.child_by_field_name("name"),
        ) {
            (Some(pkg), Some(name)) => (file.text(pkg), file.text(name)),
            _ => return Err(Error::unresolvable(qualified)),
        };

        let import = scope
            .find_import(pkg)
            .ok_or_else(|| Error::unresolvable(qualified))?;
        let Some(foreign) = self.loader.import(&scope.package.dir, &import.path)? else {
            return Err(Error::unresolvable(qualified));
        };
        tracing::debug!(
            embed = %qualified,
            dir = %foreign.dir.display(),
            "following foreign embed"
        );

        let local = LocalQualifier::Imported {
            path: import.path.clone(),
            name: import.name.clone().unwrap_or_else(|| foreign.name.clone()),
        };
        self.named(&PackageRef::Shared(foreign), local, name, qualified, args, imports, chain)
    }

    /// Flatten the named interface `type_name` of `package`
    #[allow(clippy::too_many_arguments)]
    fn named(
        &mut self,
        package: &PackageRef<'_>,
        local: LocalQualifier,
        type_name: &str,
        display: &str,
        args: Vec<TypeRef>,
        imports: &mut ImportSet,
        chain: &mut Vec<Link>,
    ) -> Result<Vec<MethodSignature>> {
        let package = package.get();

        if let Some(start) = chain
            .iter()
            .position(|l| l.dir == package.dir && l.name == type_name)
        {
            let mut cycle: Vec<String> = chain[start..].iter().map(|l| l.display.clone()).collect();
            cycle.push(display.to_string());
            return Err(Error::CyclicEmbedding { chain: cycle });
        }

        let mut found = Vec::new();
        for file in &package.files {
            for spec in file.type_specs() {
                if file.spec_name(spec) == type_name {
                    found.push((file, spec));
                }
            }
        }
        let (file, spec) = match found.as_slice() {
            [] => return Err(Error::unresolvable(display)),
            [only] => *only,
            many => {
                return Err(Error::Ambiguous {
                    name: display.to_string(),
                    locations: many.iter().map(|(f, s)| f.location(*s)).collect(),
                })
            }
        };

        let import_names = self.loader.import_names(&package.dir, &file.imports);
        let mut scope = Scope::new(package, &file.imports)
            .with_local(local)
            .with_import_names(import_names);
        if let Some(list) = spec.child_by_field_name("type_parameters") {
            scope.type_params = type_param_names(file, list);
        }
        if scope.type_params.len() != args.len() {
            return Err(Error::Unsupported {
                name: owner(chain),
                reason: format!(
                    "`{}` expects {} type argument(s), found {}",
                    display,
                    scope.type_params.len(),
                    args.len()
                ),
            });
        }

        chain.push(Link {
            dir: package.dir.clone(),
            name: type_name.to_string(),
            display: display.to_string(),
        });
        let result = self.spec_methods(&scope, file, spec, imports, chain);
        chain.pop();

        let methods = result.map_err(|e| match e {
            Error::NotAnInterface { name, .. } => Error::Unsupported {
                name: owner(chain),
                reason: format!("embeds non-interface type `{}`", name),
            },
            other => other,
        })?;

        if args.is_empty() {
            return Ok(methods);
        }
        let subst: HashMap<String, TypeRef> = scope.type_params.iter().cloned().zip(args).collect();
        Ok(methods.iter().map(|m| m.substitute(&subst)).collect())
    }
}

/// A package either borrowed from the caller's scope or owned by the loader
enum PackageRef<'p> {
    Borrowed(&'p Package),
    Shared(Rc<Package>),
}

impl PackageRef<'_> {
    fn get(&self) -> &Package {
        match self {
            PackageRef::Borrowed(p) => p,
            PackageRef::Shared(p) => p,
        }
    }
}

fn owner(chain: &[Link]) -> String {
    chain.last().map(|l| l.display.clone()).unwrap_or_default()
}

fn type_set(chain: &[Link]) -> Error {
    Error::Unsupported {
        name: owner(chain),
        reason: "type-set interfaces can only be used as constraints".to_string(),
    }
}

/// Names declared by a `type_parameter_list`, in order
pub(crate) fn type_param_names(file: &GoFile, list: Node<'_>) -> Vec<String> {
    let mut names = Vec::new();
    for decl in named_children(list) {
        if decl.kind() != "type_parameter_declaration" {
            continue;
        }
        let mut cursor = decl.walk();
        for name in decl.children_by_field_name("name", &mut cursor) {
            names.push(file.text(name).to_string());
        }
    }
    names
}
