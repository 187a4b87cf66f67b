//! Resolution of the `_module` directive to a directory on disk

use crate::error::{EnvDictError, Result};
use crate::utils::discovery::absolutize;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Literal token that refers to the base directory
pub const HERE_TOKEN: &str = "{{here}}";

/// Environment variable holding extra module search roots
pub const MODULE_PATH_VAR: &str = "ENVDICT_MODULE_PATH";

const DOTTED_IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$";

/// Locates installed modules by dotted identifier
#[cfg_attr(test, automock)]
pub trait ModuleLocator {
    /// Directory containing the file that defines `dotted`, if any
    fn locate(&self, dotted: &str) -> Option<PathBuf>;
}

/// Looks modules up under a list of search roots.
///
/// For `a.b.c` each root is checked for a package directory `a/b/c`, then
/// for a file with stem `c` inside `a/b`.
#[derive(Debug, Clone)]
pub struct SearchPathLocator {
    roots: Vec<PathBuf>,
    identifier: Regex,
}

impl SearchPathLocator {
    pub fn new(roots: Vec<PathBuf>) -> Result<Self> {
        Ok(Self {
            roots,
            identifier: Regex::new(DOTTED_IDENTIFIER_PATTERN)?,
        })
    }

    /// Roots from `ENVDICT_MODULE_PATH`, then the current directory
    pub fn from_env() -> Result<Self> {
        let mut roots: Vec<PathBuf> = std::env::var_os(MODULE_PATH_VAR)
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();

        if let Ok(cwd) = std::env::current_dir() {
            roots.push(cwd);
        }

        Self::new(roots)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check that `s` looks like `name` or `name.sub.mod`
    pub fn is_dotted_identifier(&self, s: &str) -> bool {
        self.identifier.is_match(s)
    }

    fn locate_in(root: &Path, segments: &[&str]) -> Option<PathBuf> {
        let package = segments.iter().fold(root.to_path_buf(), |acc, s| acc.join(s));
        if package.is_dir() {
            return Some(package);
        }

        let (last, parents) = segments.split_last()?;
        let parent = parents.iter().fold(root.to_path_buf(), |acc, s| acc.join(s));
        let entries = std::fs::read_dir(&parent).ok()?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.file_stem().map_or(false, |stem| stem == *last) {
                return Some(parent);
            }
        }

        None
    }
}

impl ModuleLocator for SearchPathLocator {
    fn locate(&self, dotted: &str) -> Option<PathBuf> {
        if !self.is_dotted_identifier(dotted) {
            return None;
        }

        let segments: Vec<&str> = dotted.split('.').collect();
        self.roots
            .iter()
            .find_map(|root| Self::locate_in(root, &segments))
    }
}

/// Resolve a `_module` token to an absolute directory.
///
/// Tries the `{{here}}` alias, then an existing filesystem path, then the
/// module locator.
pub fn resolve_module(
    token: &str,
    base_dir: Option<&Path>,
    locator: &dyn ModuleLocator,
) -> Result<PathBuf> {
    if token == HERE_TOKEN {
        return match base_dir {
            Some(dir) => Ok(dir.to_path_buf()),
            None => Err(EnvDictError::config(
                "_module cannot be {{here}} without a source location, \
                 load from a file or pass a base directory",
            )),
        };
    }

    let as_path = Path::new(token);
    if as_path.exists() {
        if as_path.is_file() {
            return Err(EnvDictError::config(format!(
                "Could not resolve _module \"{}\", expected a module or a directory but got a file",
                token
            )));
        }
        debug!("Resolved _module \"{}\" as a directory", token);
        return Ok(absolutize(as_path)?);
    }

    match locator.locate(token) {
        Some(dir) => {
            debug!("Resolved _module \"{}\" to {}", token, dir.display());
            Ok(absolutize(&dir)?)
        }
        None => Err(EnvDictError::config(format!(
            "Could not resolve _module \"{}\", it is not a valid module nor a directory",
            token
        ))),
    }
}
