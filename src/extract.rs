//! Function-Set Extractor
//!
//! Derives a contract from the exported top-level functions of a package
//! directory, so a package of free functions can be wrapped in an interface
//! (and then faked like any other contract).

use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::PackageLoader;
use crate::model::{dir_base_name, Contract, ImportSet, MethodSignature, PackageContext};
use crate::parse::is_exported;
use crate::resolve::{LocalQualifier, Resolver, Scope};
use crate::util::{capitalize, is_identifier, to_pascal_case};
use std::path::Path;

/// Extract the function-set contract of `dir`
pub fn extract_functions(dir: &Path) -> Result<Contract> {
    Extractor::new(PackageLoader::new(&Config::default())).extract(dir)
}

/// Function-Set Extractor
pub struct Extractor {
    loader: PackageLoader,
    qualify_local_types: bool,
}

impl Extractor {
    pub fn new(loader: PackageLoader) -> Self {
        Self {
            loader,
            qualify_local_types: false,
        }
    }

    /// Qualify types of the scanned package through its import path
    pub fn with_qualified_local_types(mut self, qualify: bool) -> Self {
        self.qualify_local_types = qualify;
        self
    }

    /// Build a contract with one method per exported function, in file path
    /// order and declaration order within each file
    pub fn extract(&mut self, dir: &Path) -> Result<Contract> {
        let package = self.loader.load_dir(dir)?;
        let name = contract_name(dir);

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
        let mut methods: Vec<MethodSignature> = Vec::new();
        for file in &package.files {
            let import_names = self.loader.import_names(&package.dir, &file.imports);
            let scope = Scope::new(&package, &file.imports)
                .with_local(local.clone())
                .with_import_names(import_names);
            for func in file.functions() {
                let Some(name_node) = func.child_by_field_name("name") else {
                    continue;
                };
                let func_name = file.text(name_node);
                if !is_exported(func_name) {
                    continue;
                }
                let location = file.location(func);
                if func.child_by_field_name("type_parameters").is_some() {
                    tracing::warn!(
                        function = %func_name,
                        location = %location,
                        "skipping generic function: interface methods cannot declare type parameters"
                    );
                    continue;
                }
                if let Some(at) = file.first_error(func) {
                    return Err(Error::CodeParse(format!(
                        "syntax error in function `{}` at {}",
                        func_name, at
                    )));
                }
                if methods.iter().any(|m| m.name == func_name) {
                    return Err(Error::DuplicateMethodName {
                        contract: name.clone(),
                        method: func_name.to_string(),
                    });
                }

                let method = Resolver::new(&scope, &file.source, &mut imports)
                    .with_file(&file.path)
                    .signature(func_name, func, location.clone())
                    .map_err(|e| e.in_method(func_name, &location))?;
                methods.push(method);
            }
        }

        if methods.is_empty() {
            return Err(Error::NoExportedFunctions {
                dir: dir.to_path_buf(),
            });
        }
        tracing::debug!(
            contract = %name,
            functions = methods.len(),
            "derived contract from functions"
        );

        let qualifier = match &local {
            LocalQualifier::Imported { path, .. } => imports.alias(path).map(str::to_string),
            LocalQualifier::Unqualified => None,
        };
        Ok(Contract {
            name,
            type_params: Vec::new(),
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
}

/// `sub` → `Sub`; names that are not identifiers once capitalized are
/// PascalCased instead (`go-kit` → `GoKit`)
pub fn contract_name(dir: &Path) -> String {
    let base = match dir.canonicalize() {
        Ok(abs) => dir_base_name(&abs),
        Err(_) => dir_base_name(dir),
    };
    let name = capitalize(&base);
    if is_identifier(&name) {
        name
    } else {
        to_pascal_case(&base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn package(files: &[(&str, &str)]) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sub");
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        (temp, dir)
    }

    #[test]
    fn test_exported_functions_in_file_order() {
        let (_temp, dir) = package(&[
            (
                "b.go",
                "package sub\n\nfunc Zeta() {}\n\nfunc Alpha(n int) (string, error) { return \"\", nil }\n",
            ),
            (
                "a.go",
                "package sub\n\nimport \"io\"\n\nfunc Copy(dst io.Writer, src ...[]byte) error { return nil }\n\nfunc helper() {}\n\nfunc (t T) Method() {}\n\ntype T struct{}\n",
            ),
        ]);

        let contract = extract_functions(&dir).unwrap();
        assert_eq!(contract.name, "Sub");
        let protos: Vec<String> = contract.methods.iter().map(|m| m.prototype()).collect();
        assert_eq!(
            protos,
            vec![
                "Copy(dst io.Writer, src ...[]byte) error",
                "Zeta()",
                "Alpha(n int) (string, error)",
            ]
        );
        assert_eq!(contract.imports.alias("io"), Some("io"));
    }

    #[test]
    fn test_no_exported_functions() {
        let (_temp, dir) = package(&[("a.go", "package sub\n\nfunc helper() {}\n")]);
        assert!(matches!(
            extract_functions(&dir).unwrap_err(),
            Error::NoExportedFunctions { .. }
        ));
    }

    #[test]
    fn test_generic_functions_are_skipped() {
        let (_temp, dir) = package(&[(
            "a.go",
            "package sub\n\nfunc Map[T any](xs []T) []T { return xs }\n\nfunc Len(xs []int) int { return 0 }\n",
        )]);
        let contract = extract_functions(&dir).unwrap();
        assert_eq!(contract.methods.len(), 1);
        assert_eq!(contract.methods[0].name, "Len");
    }

    #[test]
    fn test_contract_name_from_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("go-kit");
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(contract_name(&dir), "GoKit");
        assert_eq!(contract_name(Path::new("/nonexistent/store")), "Store");
    }
}
