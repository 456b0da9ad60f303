//! Template-based fake generation
//!
//! Uses MiniJinja templates for properly formatted code generation.
//! The fake template is embedded by default and can be replaced with a
//! `fake.go.jinja` from the `template_dir` configured in `.counterfeit.yaml`.

pub mod context;
pub mod filters;

use minijinja::Environment;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::model::Contract;

pub use context::{FakeContext, FakeSettings};

/// Name of the fake template, embedded and in override directories
pub const FAKE_TEMPLATE: &str = "fake.go.jinja";

// Embedded templates (compiled into binary)
mod embedded {
    pub const FAKE: &str = include_str!("../../templates/fake.go.jinja");
}

/// Template engine singleton
static ENGINE: OnceLock<std::result::Result<Environment<'static>, String>> = OnceLock::new();

fn base_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
    filters::register_filters(&mut env);
    env
}

/// Initialize the template engine with embedded templates
fn init_engine() -> std::result::Result<Environment<'static>, String> {
    let mut env = base_env();
    env.add_template(FAKE_TEMPLATE, embedded::FAKE)
        .map_err(|e| format!("embedded {}: {}", FAKE_TEMPLATE, e))?;
    Ok(env)
}

/// Get the global template engine
pub fn engine() -> Result<&'static Environment<'static>> {
    ENGINE
        .get_or_init(init_engine)
        .as_ref()
        .map_err(|e| Error::Render(e.clone()))
}

/// Create a template engine whose templates in `custom_dir` override the
/// embedded ones
pub fn engine_with_override(custom_dir: &Path) -> Result<Environment<'static>> {
    let mut env = init_engine().map_err(Error::Render)?;

    let path = custom_dir.join(FAKE_TEMPLATE);
    if path.exists() {
        let content = std::fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        env.add_template_owned(FAKE_TEMPLATE, content)
            .map_err(|e| Error::Render(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(template = %path.display(), "using custom fake template");
    }

    Ok(env)
}

/// Render a fake of `contract`
pub fn render_fake(
    contract: &Contract,
    settings: &FakeSettings<'_>,
    template_dir: Option<&Path>,
) -> Result<String> {
    let ctx = FakeContext::from_contract(contract, settings);
    match template_dir {
        Some(dir) => render_with(&engine_with_override(dir)?, &ctx),
        None => render_with(engine()?, &ctx),
    }
}

fn render_with(env: &Environment<'_>, ctx: &FakeContext) -> Result<String> {
    let template = env
        .get_template(FAKE_TEMPLATE)
        .map_err(|e| Error::Render(e.to_string()))?;
    template.render(ctx).map_err(|e| Error::Render(e.to_string()))
}
