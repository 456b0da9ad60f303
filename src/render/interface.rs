//! Go interface generation using genco

use crate::error::{Error, Result};
use crate::model::Contract;
use genco::prelude::*;

use super::{RenderConfig, GENERATED_HEADER};

/// Render `contract` as a Go interface declaration in `package_name`
pub fn render(contract: &Contract, package_name: &str, config: &RenderConfig) -> Result<String> {
    let tokens = InterfaceRenderer {
        config,
        contract,
        package_name,
    }
    .render();
    tokens
        .to_file_string()
        .map_err(|e| Error::Render(e.to_string()))
}

struct InterfaceRenderer<'a> {
    config: &'a RenderConfig,
    contract: &'a Contract,
    package_name: &'a str,
}

impl InterfaceRenderer<'_> {
    fn render(&self) -> go::Tokens {
        let imports: Vec<String> = self
            .contract
            .imports
            .lines()
            .iter()
            .map(ToString::to_string)
            .collect();

        quote! {
            $(if self.config.header {
                $(GENERATED_HEADER)
                $['\n']
            })

            package $(self.package_name)
            $['\n']

            $(if !imports.is_empty() {
                import (
                    $(for line in &imports join ($['\r']) => $line)
                )
                $['\n']
            })

            $(self.doc())
            type $(&self.contract.name)$(self.contract.type_params_decl()) interface {
                $(for method in &self.contract.methods join ($['\r']) => $(method.prototype()))
            }
        }
    }

    fn doc(&self) -> String {
        let package = &self.contract.package.name;
        format!(
            "// {} declares the API of package {}, so it can be faked.",
            self.contract.name, package
        )
    }
}
