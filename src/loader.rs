//! Package search for embedded foreign interfaces
//!
//! Maps an import path to a directory on disk the way a GOPATH-era
//! toolchain would: the enclosing module first, then its `vendor/` tree,
//! then configured roots, `$GOPATH` and `$GOROOT`. Loaded packages are
//! cached per directory for the life of the loader.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parse::{go_files, GoFile, Import, Package};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A Go module found through its `go.mod`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub root: PathBuf,
    /// Path from the `module` directive
    pub path: String,
}

impl Module {
    /// Find the nearest `go.mod` at or above `start_dir`
    pub fn find(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = match start_dir.canonicalize() {
            Ok(dir) => dir,
            Err(_) => return Ok(None),
        };

        loop {
            let go_mod = current.join("go.mod");
            if go_mod.is_file() {
                let content = std::fs::read_to_string(&go_mod).map_err(|source| Error::Read {
                    path: go_mod.clone(),
                    source,
                })?;
                return Ok(parse_module_directive(&content).map(|path| Module {
                    root: current,
                    path,
                }));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Import path of a directory inside this module
    pub fn import_path_of(&self, dir: &Path) -> Option<String> {
        let dir = dir.canonicalize().ok()?;
        let rel = dir.strip_prefix(&self.root).ok()?;
        match slash_path(rel) {
            Some(rel) => Some(format!("{}/{}", self.path, rel)),
            None => Some(self.path.clone()),
        }
    }

    /// Directory of an import path inside this module
    pub fn dir_of(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.root.clone());
        }
        let rest = import_path.strip_prefix(&self.path)?.strip_prefix('/')?;
        Some(self.root.join(rest))
    }
}

/// `example.com/lib` from a path relative to a source root
fn slash_path(rel: &Path) -> Option<String> {
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// `module example.com/app` → `example.com/app`
fn parse_module_directive(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches(|c| c == '"' || c == '`');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Resolves and caches packages for one extraction run
#[derive(Debug, Default)]
pub struct PackageLoader {
    search_paths: Vec<PathBuf>,
    gopath: Vec<PathBuf>,
    goroot: Option<PathBuf>,
    cache: HashMap<PathBuf, Rc<Package>>,
    /// Package clause names of directories looked up without loading them
    names: HashMap<PathBuf, Option<String>>,
}

impl PackageLoader {
    pub fn new(config: &Config) -> Self {
        let gopath = std::env::var_os("GOPATH")
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_default();
        let goroot = config
            .goroot
            .clone()
            .or_else(|| std::env::var_os("GOROOT").map(PathBuf::from));
        Self {
            search_paths: config.search_paths.clone(),
            gopath,
            goroot,
            cache: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Loader that only looks inside modules and the given roots
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            ..Self::default()
        }
    }

    /// Load (or fetch from cache) the package in `dir`
    pub fn load_dir(&mut self, dir: &Path) -> Result<Rc<Package>> {
        let key = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if let Some(pkg) = self.cache.get(&key) {
            return Ok(Rc::clone(pkg));
        }
        let import_path = self.import_path_of(dir)?;
        let pkg = Rc::new(Package::load_dir(dir)?.with_import_path(import_path));
        self.cache.insert(key, Rc::clone(&pkg));
        Ok(pkg)
    }

    /// Load the package a single file belongs to. Not cached: the file may
    /// belong to a different package than its siblings.
    pub fn load_file(&mut self, path: &Path) -> Result<Rc<Package>> {
        let pkg = Package::load_file(path)?;
        let import_path = self.import_path_of(&pkg.dir)?;
        Ok(Rc::new(pkg.with_import_path(import_path)))
    }

    /// Import path of a package directory: relative to the enclosing
    /// module, or else to a `src/` tree of a configured root or `$GOPATH`
    pub fn import_path_of(&self, dir: &Path) -> Result<Option<String>> {
        if let Some(module) = Module::find(dir)? {
            return Ok(module.import_path_of(dir));
        }
        let Ok(dir) = dir.canonicalize() else {
            return Ok(None);
        };
        let roots = self
            .search_paths
            .iter()
            .flat_map(|root| [root.join("src"), root.clone()])
            .chain(self.gopath.iter().map(|root| root.join("src")));
        for root in roots {
            let Ok(root) = root.canonicalize() else {
                continue;
            };
            if let Some(path) = dir.strip_prefix(&root).ok().and_then(slash_path) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Name in the `package` clause of the package imported as
    /// `import_path`, read from a single file when the package is not loaded
    pub fn package_name(&mut self, from_dir: &Path, import_path: &str) -> Result<Option<String>> {
        let Some(dir) = self.find_import_dir(from_dir, import_path)? else {
            return Ok(None);
        };
        let key = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        if let Some(pkg) = self.cache.get(&key) {
            return Ok(Some(pkg.name.clone()));
        }
        if let Some(name) = self.names.get(&key) {
            return Ok(name.clone());
        }

        let mut name = None;
        for path in go_files(&dir)? {
            let file = GoFile::read(&path)?;
            // generator scripts in a library directory declare `package main`
            if !file.package.is_empty() && file.package != "main" {
                name = Some(file.package);
                break;
            }
        }
        self.names.insert(key, name.clone());
        Ok(name)
    }

    /// Declared package names of a file's unnamed imports, keyed by path.
    /// Imports that cannot be found are left out.
    pub fn import_names(&mut self, from_dir: &Path, imports: &[Import]) -> HashMap<String, String> {
        let mut names = HashMap::new();
        for import in imports.iter().filter(|i| i.name.is_none()) {
            match self.package_name(from_dir, &import.path) {
                Ok(Some(name)) => {
                    names.insert(import.path.clone(), name);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(import = %import.path, error = %e, "could not read package name");
                }
            }
        }
        names
    }

    /// Locate and load the package imported as `import_path` from `from_dir`
    pub fn import(&mut self, from_dir: &Path, import_path: &str) -> Result<Option<Rc<Package>>> {
        let Some(dir) = self.find_import_dir(from_dir, import_path)? else {
            tracing::debug!(import = %import_path, "package not found on search path");
            return Ok(None);
        };
        let key = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        if let Some(pkg) = self.cache.get(&key) {
            return Ok(Some(Rc::clone(pkg)));
        }
        let pkg = Rc::new(Package::load_dir(&dir)?.with_import_path(Some(import_path.to_string())));
        self.cache.insert(key, Rc::clone(&pkg));
        Ok(Some(pkg))
    }

    fn find_import_dir(&self, from_dir: &Path, import_path: &str) -> Result<Option<PathBuf>> {
        let mut candidates = Vec::new();

        if let Some(module) = Module::find(from_dir)? {
            if let Some(dir) = module.dir_of(import_path) {
                candidates.push(dir);
            }
            candidates.push(module.root.join("vendor").join(import_path));
        }
        for root in &self.search_paths {
            candidates.push(root.join("src").join(import_path));
            candidates.push(root.join(import_path));
        }
        for root in &self.gopath {
            candidates.push(root.join("src").join(import_path));
        }
        if let Some(goroot) = &self.goroot {
            candidates.push(goroot.join("src").join(import_path));
        }

        Ok(candidates.into_iter().find(|dir| dir.is_dir()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_module_directive() {
        assert_eq!(
            parse_module_directive("// comment\nmodule example.com/app // trailing\n\ngo 1.22\n"),
            Some("example.com/app".to_string())
        );
        assert_eq!(parse_module_directive("go 1.22\n"), None);
        assert_eq!(parse_module_directive("modules x\n"), None);
    }

    #[test]
    fn test_module_import_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("go.mod"), "module example.com/app\n").unwrap();
        let sub = temp.path().join("internal").join("store");
        fs::create_dir_all(&sub).unwrap();

        let module = Module::find(&sub).unwrap().unwrap();
        assert_eq!(module.path, "example.com/app");
        assert_eq!(
            module.import_path_of(&sub).as_deref(),
            Some("example.com/app/internal/store")
        );
        assert_eq!(
            module.dir_of("example.com/app/internal/store"),
            Some(module.root.join("internal/store"))
        );
        assert_eq!(module.dir_of("example.com/other"), None);
    }

    #[test]
    fn test_import_path_without_module() {
        let temp = TempDir::new().unwrap();
        let under_src = temp.path().join("src").join("example.com").join("old");
        let bare = temp.path().join("example.com").join("bare");
        fs::create_dir_all(&under_src).unwrap();
        fs::create_dir_all(&bare).unwrap();

        let loader = PackageLoader::with_search_paths(vec![temp.path().to_path_buf()]);
        assert_eq!(
            loader.import_path_of(&under_src).unwrap().as_deref(),
            Some("example.com/old")
        );
        assert_eq!(
            loader.import_path_of(&bare).unwrap().as_deref(),
            Some("example.com/bare")
        );
        assert_eq!(loader.import_path_of(temp.path()).unwrap(), None);

        let elsewhere = TempDir::new().unwrap();
        assert_eq!(loader.import_path_of(elsewhere.path()).unwrap(), None);
    }

    #[test]
    fn test_package_name_skips_main() {
        let temp = TempDir::new().unwrap();
        let pkg_dir = temp.path().join("src").join("example.com").join("api").join("v2");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("a_gen.go"), "package main\n\nfunc main() {}\n").unwrap();
        fs::write(pkg_dir.join("b.go"), "package api\n").unwrap();

        let mut loader = PackageLoader::with_search_paths(vec![temp.path().to_path_buf()]);
        assert_eq!(
            loader.package_name(temp.path(), "example.com/api/v2").unwrap().as_deref(),
            Some("api")
        );
        assert_eq!(loader.package_name(temp.path(), "example.com/none").unwrap(), None);
    }

    #[test]
    fn test_import_from_search_path() {
        let temp = TempDir::new().unwrap();
        let pkg_dir = temp.path().join("src").join("example.com").join("lib");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("lib.go"), "package lib\n\ntype Closer interface{ Close() error }\n")
            .unwrap();

        let mut loader = PackageLoader::with_search_paths(vec![temp.path().to_path_buf()]);
        let pkg = loader
            .import(temp.path(), "example.com/lib")
            .unwrap()
            .expect("package should be found");
        assert_eq!(pkg.name, "lib");
        assert_eq!(pkg.import_path.as_deref(), Some("example.com/lib"));
        assert!(pkg.declares_type("Closer"));

        assert!(loader.import(temp.path(), "example.com/missing").unwrap().is_none());
    }
}
