//! Code rendering: Go source from a contract model
//!
//! Two synthesizers share one validation step:
//! - the fake synthesizer (MiniJinja template, see [`crate::templates`])
//! - the interface synthesizer (genco), for contracts derived from functions

mod interface;

use crate::error::{Error, Result};
use crate::model::Contract;
use crate::templates::{self, FakeSettings};
use crate::util::is_identifier;
use std::collections::HashSet;
use std::path::PathBuf;

/// First line of every generated file
pub const GENERATED_HEADER: &str = "// Code generated by counterfeit. DO NOT EDIT.";

/// Generate a fake of `contract` named `struct_name` in `package_name`
pub fn generate_fake(contract: &Contract, struct_name: &str, package_name: &str) -> Result<String> {
    Renderer::new().fake(contract, struct_name, package_name)
}

/// Generate an interface declaration of `contract` in `package_name`
pub fn generate_interface(contract: &Contract, package_name: &str) -> Result<String> {
    Renderer::new().interface(contract, package_name)
}

/// Code renderer
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

/// Render configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Include the "Code generated" header
    pub header: bool,
    /// Directory whose `fake.go.jinja` replaces the embedded template
    pub template_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            header: true,
            template_dir: None,
        }
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render a fake
    pub fn fake(&self, contract: &Contract, struct_name: &str, package_name: &str) -> Result<String> {
        check_identifier("fake name", struct_name)?;
        check_identifier("package name", package_name)?;
        validate(contract)?;

        let settings = FakeSettings {
            struct_name,
            package_name,
            header: self.config.header,
        };
        let code =
            templates::render_fake(contract, &settings, self.config.template_dir.as_deref())?;
        tracing::debug!(
            fake = %struct_name,
            contract = %contract.name,
            bytes = code.len(),
            "rendered fake"
        );
        Ok(code)
    }

    /// Render an interface declaration
    pub fn interface(&self, contract: &Contract, package_name: &str) -> Result<String> {
        check_identifier("package name", package_name)?;
        validate(contract)?;
        interface::render(contract, package_name, &self.config)
    }
}

/// A contract must have methods, and their names must be unique
fn validate(contract: &Contract) -> Result<()> {
    if contract.methods.is_empty() {
        return Err(Error::EmptyContract {
            name: contract.name.clone(),
        });
    }
    let mut seen = HashSet::new();
    for method in &contract.methods {
        if !seen.insert(method.name.as_str()) {
            return Err(Error::DuplicateMethodName {
                contract: contract.name.clone(),
                method: method.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_identifier(what: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!(
            "{} `{}` is not a valid Go identifier",
            what, name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ImportSet, Location, MethodSignature, PackageContext, Parameter, Qualifier, ReturnValue,
        TypeRef,
    };
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn method(name: &str) -> MethodSignature {
        MethodSignature {
            name: name.into(),
            params: vec![Parameter {
                name: "w".into(),
                typ: TypeRef::Named {
                    qualifier: Qualifier::Package {
                        alias: "io".into(),
                        path: "io".into(),
                    },
                    name: "Writer".into(),
                    args: vec![],
                },
                variadic: false,
            }],
            results: vec![ReturnValue {
                name: "err".into(),
                typ: TypeRef::builtin("error"),
            }],
            location: Location::new("sub.go", 3),
        }
    }

    fn contract(methods: Vec<MethodSignature>) -> Contract {
        let mut imports = ImportSet::new();
        imports.add("io", "io");
        Contract {
            name: "Sub".into(),
            type_params: Vec::new(),
            methods,
            package: PackageContext {
                name: "sub".into(),
                dir: PathBuf::from("/src/sub"),
                import_path: None,
                qualifier: None,
            },
            imports,
        }
    }

    #[test]
    fn test_empty_contract() {
        let err = generate_fake(&contract(vec![]), "FakeSub", "fakes").unwrap_err();
        assert!(matches!(err, Error::EmptyContract { .. }));
        let err = generate_interface(&contract(vec![]), "fakes").unwrap_err();
        assert!(matches!(err, Error::EmptyContract { .. }));
    }

    #[test]
    fn test_duplicate_method_name() {
        let err = generate_fake(&contract(vec![method("Dump"), method("Dump")]), "F", "p")
            .unwrap_err();
        match err {
            Error::DuplicateMethodName { method, .. } => assert_eq!(method, "Dump"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_invalid_names() {
        let c = contract(vec![method("Dump")]);
        assert!(matches!(
            generate_fake(&c, "Fake-Sub", "fakes").unwrap_err(),
            Error::InvalidRequest(_)
        ));
        assert!(matches!(
            generate_interface(&c, "type").unwrap_err(),
            Error::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_generate_interface() {
        let code = generate_interface(&contract(vec![method("Dump"), method("Flush")]), "fakes")
            .unwrap();
        let lines: Vec<&str> = code.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(
            lines,
            vec![
                GENERATED_HEADER,
                "package fakes",
                "import (",
                "\"io\"",
                ")",
                "// Sub declares the API of package sub, so it can be faked.",
                "type Sub interface {",
                "Dump(w io.Writer) (err error)",
                "Flush(w io.Writer) (err error)",
                "}",
            ]
        );
    }

    #[test]
    fn test_interface_without_header() {
        let renderer = Renderer::with_config(RenderConfig {
            header: false,
            template_dir: None,
        });
        let code = renderer
            .interface(&contract(vec![method("Dump")]), "fakes")
            .unwrap();
        assert!(code.trim_start().starts_with("package fakes"));
    }
}
