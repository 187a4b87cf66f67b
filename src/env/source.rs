//! Locating and loading the raw environment data

use crate::error::{EnvDictError, Result};
use crate::utils::discovery::{absolutize, find_file_recursively, MAX_PARENT_LEVELS};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where environment data comes from
#[derive(Debug, Clone, PartialEq)]
pub enum EnvSource {
    /// In-memory data; no source path is recorded
    Mapping(Mapping),
    /// A YAML file, searched for upwards if it does not exist as given
    Path(PathBuf),
    /// Look for `env.<host>.yaml`, then `env.yaml`
    Discover,
}

impl From<Mapping> for EnvSource {
    fn from(mapping: Mapping) -> Self {
        Self::Mapping(mapping)
    }
}

impl From<PathBuf> for EnvSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for EnvSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for EnvSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl<T: Into<EnvSource>> From<Option<T>> for EnvSource {
    fn from(source: Option<T>) -> Self {
        source.map_or(Self::Discover, Into::into)
    }
}

/// Raw data plus the absolute path it was read from
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub raw: Mapping,
    pub path: Option<PathBuf>,
}

/// Resolve `source` and read it into a raw mapping.
///
/// `search_from` is where upward file searches start; `host` names the
/// `env.<host>.yaml` file tried first during discovery.
pub fn load_from_source(source: EnvSource, search_from: &Path, host: &str) -> Result<LoadedSource> {
    let path = match source {
        EnvSource::Mapping(raw) => return Ok(LoadedSource { raw, path: None }),
        EnvSource::Discover => discover_env(search_from, host)?,
        EnvSource::Path(path) if path.as_os_str().is_empty() => discover_env(search_from, host)?,
        EnvSource::Path(path) => {
            if path.exists() {
                path
            } else {
                let name = path.to_string_lossy();
                find_file_recursively(&name, search_from).ok_or_else(|| {
                    EnvDictError::not_found(format!(
                        "Could not find file \"{}\" in the current working directory nor {} levels up",
                        name, MAX_PARENT_LEVELS
                    ))
                })?
            }
        }
    };

    info!("Loading env from {}", path.display());
    let raw = read_mapping(&path)?;
    Ok(LoadedSource {
        raw,
        path: Some(absolutize(&path)?),
    })
}

/// Find `env.<host>.yaml`, falling back to `env.yaml`
pub fn discover_env(search_from: &Path, host: &str) -> Result<PathBuf> {
    let named = format!("env.{}.yaml", host);
    if let Some(path) = find_file_recursively(&named, search_from) {
        return Ok(path);
    }

    debug!("No {} found, trying env.yaml", named);
    find_file_recursively("env.yaml", search_from).ok_or_else(|| {
        EnvDictError::not_found(format!(
            "Tried to initialize environment with automatic file search, but failed to locate \
             {} nor env.yaml in the current directory nor {} levels up",
            named, MAX_PARENT_LEVELS
        ))
    })
}

/// Parse a YAML file that must contain a top-level mapping
pub fn read_mapping(path: &Path) -> Result<Mapping> {
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&contents).map_err(|e| {
        EnvDictError::config_with_source(
            format!(
                "Failed to parse YAML file '{}', fix syntax errors and try again",
                path.display()
            ),
            e,
        )
    })?;

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(EnvDictError::config(format!(
            "Expected object loaded from '{}' to be a mapping but got '{}' instead, verify the content",
            path.display(),
            type_name(&other)
        ))),
    }
}

/// Short name of a YAML node kind, for error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
