//! Counterfeit configuration
//!
//! Loaded from the nearest `.counterfeit.yaml` at or above the source path.
//! Every field has a default, so an empty file (or no file) is valid.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file
pub const CONFIG_FILE: &str = ".counterfeit.yaml";

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Prefix of generated fake names (`Fake` + `Store` = `FakeStore`)
    #[serde(default = "default_fake_prefix")]
    pub fake_prefix: String,

    /// Suffix of the default destination package (`store` + `fakes`)
    #[serde(default = "default_package_suffix")]
    pub package_suffix: String,

    /// Emit the "Code generated ... DO NOT EDIT." header
    #[serde(default = "default_true")]
    pub header: bool,

    /// Run gofmt on generated code when it is available
    #[serde(default = "default_true")]
    pub format: bool,

    /// Qualify types of the source package when the fake lives elsewhere
    #[serde(default = "default_true")]
    pub qualify_local_types: bool,

    /// Extra roots searched for imported packages (GOPATH layout or flat)
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Go installation used to find standard library packages
    #[serde(default)]
    pub goroot: Option<PathBuf>,

    /// Directory holding a `fake.go.jinja` that replaces the built-in template
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
}

fn default_fake_prefix() -> String {
    "Fake".to_string()
}

fn default_package_suffix() -> String {
    "fakes".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fake_prefix: default_fake_prefix(),
            package_suffix: default_package_suffix(),
            header: true,
            format: true,
            qualify_local_types: true,
            search_paths: Vec::new(),
            goroot: None,
            template_dir: None,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_norway::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load `.counterfeit.yaml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_file = dir.join(CONFIG_FILE);
        if !config_file.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_file).map_err(|source| Error::Read {
            path: config_file.clone(),
            source,
        })?;
        let mut config = Self::from_yaml(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_file.display(), e))
        })?;
        config.resolve_relative_paths(dir);
        Ok(Some(config))
    }

    /// Find the nearest config at or above `start`, or the default
    pub fn discover(start: &Path) -> Result<Self> {
        let start = if start.is_file() {
            start.parent().unwrap_or(start)
        } else {
            start
        };
        let mut current = match start.canonicalize() {
            Ok(dir) => dir,
            Err(_) => return Ok(Self::default()),
        };

        loop {
            if let Some(config) = Self::load_from_dir(&current)? {
                tracing::debug!(dir = %current.display(), "loaded configuration");
                return Ok(config);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(Self::default()),
            }
        }
    }

    /// Relative paths in a config file are relative to that file
    fn resolve_relative_paths(&mut self, base: &Path) {
        for path in &mut self.search_paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        for path in [&mut self.goroot, &mut self.template_dir].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// JSON schema of the configuration file
    pub fn schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("fake_prefix: Stub\nheader: false\n").unwrap();
        assert_eq!(config.fake_prefix, "Stub");
        assert!(!config.header);
        assert_eq!(config.package_suffix, "fakes");
        assert!(config.format);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Config::from_yaml("header: [not, a, bool]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_discover_walks_up_and_resolves_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "search_paths:\n  - third_party\npackage_suffix: mocks\n",
        )
        .unwrap();
        let nested = temp.path().join("pkg").join("store");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(&nested).unwrap();
        assert_eq!(config.package_suffix, "mocks");
        let root = temp.path().canonicalize().unwrap();
        assert_eq!(config.search_paths, vec![root.join("third_party")]);
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = Config::schema().unwrap();
        assert!(schema.contains("fake_prefix"));
        assert!(schema.contains("search_paths"));
    }
}
