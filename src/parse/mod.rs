//! Go source loading via tree-sitter
//!
//! A [`Package`] is every non-test `.go` file of one directory that shares a
//! `package` clause. Files are always kept sorted by path so everything built
//! on top of them (candidate order, method order, diagnostics) is stable.

mod go;

pub use go::{is_exported, GoFile, Import};
pub(crate) use go::{named_children, parse_tree};

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// The Go files of one package directory
#[derive(Debug)]
pub struct Package {
    pub dir: PathBuf,
    /// Name from the `package` clause
    pub name: String,
    pub files: Vec<GoFile>,
    /// Import path, when known
    pub import_path: Option<String>,
    local_types: BTreeSet<String>,
}

impl Package {
    /// Load every package file of a directory
    pub fn load_dir(dir: &Path) -> Result<Self> {
        Self::load(dir, None)
    }

    /// Load the package a file belongs to. The file itself is always part of
    /// the result, even when it is a `_test.go` file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::load(dir, Some(path))
    }

    fn load(dir: &Path, focus: Option<&Path>) -> Result<Self> {
        let mut paths = go_files(dir)?;
        if let Some(focus) = focus {
            if !paths.iter().any(|p| same_file(p, focus)) {
                paths.push(focus.to_path_buf());
                paths.sort();
            }
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            files.push(GoFile::read(path)?);
        }

        let name = match focus {
            Some(focus) => files
                .iter()
                .find(|f| same_file(&f.path, focus))
                .map(|f| f.package.clone())
                .unwrap_or_default(),
            None => majority_package(&files),
        };

        files.retain(|f| {
            let keep = f.package == name;
            if !keep {
                tracing::debug!(
                    file = %f.path.display(),
                    package = %f.package,
                    expected = %name,
                    "skipping file from another package"
                );
            }
            keep
        });

        tracing::debug!(
            dir = %dir.display(),
            package = %name,
            files = files.len(),
            "loaded Go package"
        );

        Ok(Self::from_files(dir, name, files))
    }

    /// Assemble a package from already parsed files
    pub fn from_files(dir: impl Into<PathBuf>, name: impl Into<String>, files: Vec<GoFile>) -> Self {
        let local_types = files
            .iter()
            .flat_map(|f| {
                f.type_specs()
                    .into_iter()
                    .map(|spec| f.spec_name(spec).to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|n| !n.is_empty())
            .collect();

        Package {
            dir: dir.into(),
            name: name.into(),
            files,
            import_path: None,
            local_types,
        }
    }

    pub fn with_import_path(mut self, import_path: Option<String>) -> Self {
        self.import_path = import_path;
        self
    }

    /// Whether a package-level type with this name exists
    pub fn declares_type(&self, name: &str) -> bool {
        self.local_types.contains(name)
    }

    pub fn local_types(&self) -> impl Iterator<Item = &str> {
        self.local_types.iter().map(String::as_str)
    }

    pub fn file(&self, path: &Path) -> Option<&GoFile> {
        self.files.iter().find(|f| same_file(&f.path, path))
    }
}

/// Non-test `.go` files of a directory, sorted by path
pub fn go_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(Error::Io)?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && file_name.ends_with(".go") && !file_name.ends_with("_test.go") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Most common `package` clause; ties go to the first file in path order
fn majority_package(files: &[GoFile]) -> String {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (index, file) in files.iter().enumerate() {
        let entry = counts.entry(file.package.as_str()).or_insert((0, index));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(name, _)| name.to_string())
        .unwrap_or_default()
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_dir_skips_tests_and_other_packages() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.go", "package shop\n\ntype Cart struct{}\n");
        write(temp.path(), "a.go", "package shop\n\ntype Item int\n");
        write(temp.path(), "a_test.go", "package shop\n\ntype Fixture int\n");
        write(temp.path(), "gen.go", "//go:build ignore\n\npackage main\n\ntype Tool int\n");

        let pkg = Package::load_dir(temp.path()).unwrap();
        assert_eq!(pkg.name, "shop");
        let names: Vec<String> = pkg
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
        assert!(pkg.declares_type("Cart"));
        assert!(pkg.declares_type("Item"));
        assert!(!pkg.declares_type("Fixture"));
        assert!(!pkg.declares_type("Tool"));
    }

    #[test]
    fn test_load_file_uses_its_package_clause() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.go", "package shop\n");
        write(temp.path(), "b.go", "package shop\n");
        let tool = write(temp.path(), "tool.go", "package main\n\ntype Runner interface{}\n");

        let pkg = Package::load_file(&tool).unwrap();
        assert_eq!(pkg.name, "main");
        assert_eq!(pkg.files.len(), 1);
        assert!(pkg.file(&tool).is_some());
    }

    #[test]
    fn test_missing_dir_is_read_error() {
        let err = Package::load_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
