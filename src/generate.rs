//! Generation requests
//!
//! The boundary between the command line and the core: a [`Request`] names
//! what to extract and where the result will live, [`generate`] returns the
//! source text and a suggested file name. Nothing is written to disk here.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::loader::PackageLoader;
use crate::locate::Locator;
use crate::model::{dir_base_name, Contract};
use crate::render::{RenderConfig, Renderer};
use crate::util::{is_identifier, to_snake_case};
use serde::Serialize;
use std::path::PathBuf;

/// Which extraction path a request takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Fake an existing interface
    LocateExisting,
    /// Derive an interface from a package's exported functions
    DeriveFromFunctions,
}

/// One generation request
#[derive(Debug, Clone)]
pub struct Request {
    /// Interface to fake; required when locating
    pub contract_name: Option<String>,
    /// File or directory to read
    pub source_path: PathBuf,
    /// Name of the fake; defaults to the configured prefix plus the contract name
    pub struct_name: Option<String>,
    /// Package the generated file belongs to
    pub package_name: String,
    pub mode: Mode,
    /// Qualify types of the source package (the output lives elsewhere)
    pub qualify_local_types: bool,
}

impl Request {
    pub fn locate(contract_name: &str, source_path: impl Into<PathBuf>, package_name: &str) -> Self {
        Self {
            contract_name: Some(contract_name.to_string()),
            source_path: source_path.into(),
            struct_name: None,
            package_name: package_name.to_string(),
            mode: Mode::LocateExisting,
            qualify_local_types: false,
        }
    }

    pub fn derive(source_dir: impl Into<PathBuf>, package_name: &str) -> Self {
        Self {
            contract_name: None,
            source_path: source_dir.into(),
            struct_name: None,
            package_name: package_name.to_string(),
            mode: Mode::DeriveFromFunctions,
            qualify_local_types: false,
        }
    }

    pub fn with_struct_name(mut self, struct_name: &str) -> Self {
        self.struct_name = Some(struct_name.to_string());
        self
    }

    pub fn with_qualified_local_types(mut self, qualify: bool) -> Self {
        self.qualify_local_types = qualify;
        self
    }
}

/// Result of a request
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    /// Name of the generated fake or interface
    pub name: String,
    pub source: String,
    /// Suggested output file name
    pub file_name: String,
}

/// Extract the contract a request refers to
pub fn contract(request: &Request, config: &Config) -> Result<Contract> {
    let loader = PackageLoader::new(config);
    match request.mode {
        Mode::LocateExisting => {
            let name = contract_name(request)?;
            Locator::new(loader)
                .with_qualified_local_types(request.qualify_local_types)
                .locate(name, &request.source_path)
        }
        Mode::DeriveFromFunctions => {
            if !request.source_path.is_dir() {
                return Err(Error::InvalidRequest(format!(
                    "{} is not a directory",
                    request.source_path.display()
                )));
            }
            Extractor::new(loader)
                .with_qualified_local_types(request.qualify_local_types)
                .extract(&request.source_path)
        }
    }
}

/// Run a request end to end
pub fn generate(request: &Request, config: &Config) -> Result<Generated> {
    if !is_identifier(&request.package_name) {
        return Err(Error::InvalidRequest(format!(
            "package name `{}` is not a valid Go identifier",
            request.package_name
        )));
    }
    let contract = contract(request, config)?;
    generate_from(&contract, request, config)
}

/// Synthesize from an already extracted contract
pub fn generate_from(contract: &Contract, request: &Request, config: &Config) -> Result<Generated> {
    let renderer = Renderer::with_config(RenderConfig {
        header: config.header,
        template_dir: config.template_dir.clone(),
    });

    match request.mode {
        Mode::LocateExisting => {
            let name = request
                .struct_name
                .clone()
                .unwrap_or_else(|| format!("{}{}", config.fake_prefix, contract.name));
            let source = renderer.fake(contract, &name, &request.package_name)?;
            Ok(Generated {
                file_name: format!("{}.go", to_snake_case(&name)),
                name,
                source,
            })
        }
        Mode::DeriveFromFunctions => {
            let source = renderer.interface(contract, &request.package_name)?;
            let base = match request.source_path.canonicalize() {
                Ok(dir) => dir_base_name(&dir),
                Err(_) => dir_base_name(&request.source_path),
            };
            Ok(Generated {
                name: contract.name.clone(),
                source,
                file_name: format!("{}.go", to_snake_case(&base)),
            })
        }
    }
}

fn contract_name(request: &Request) -> Result<&str> {
    match request.contract_name.as_deref() {
        Some(name) if is_identifier(name) => Ok(name),
        Some(name) => Err(Error::InvalidRequest(format!(
            "interface name `{}` is not a valid Go identifier",
            name
        ))),
        None => Err(Error::InvalidRequest(
            "an interface name is required to locate a contract".into(),
        )),
    }
}
