//! Placeholder table and recursive `{{name}}` expansion
//!
//! The table is built once per load from the built-in values (user, working
//! directory, project root, base directory) with raw top-level keys of the
//! same names taking precedence. Expansion is a pure function of the table
//! and the input tree; references to other raw keys are not resolved.

use crate::error::{EnvDictError, Result};
use crate::utils::discovery::{current_user, find_root_recursively};
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const USER: &str = "user";
pub const CWD: &str = "cwd";
pub const ROOT: &str = "root";
pub const HERE: &str = "here";

/// Names that can be used as placeholders
pub const BUILTIN_NAMES: &[&str] = &[USER, CWD, ROOT, HERE];

const TOKEN_PATTERN: &str = r"\{\{\s*([^{}]*?)\s*\}\}";

/// Values detected from the host for the built-in placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Builtins {
    pub user: String,
    pub cwd: PathBuf,
    pub root: Option<PathBuf>,
}

impl Builtins {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(user: S, cwd: P, root: Option<PathBuf>) -> Self {
        Self {
            user: user.into(),
            cwd: cwd.into(),
            root,
        }
    }

    /// Detect the current user, working directory and project root
    pub fn detect() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let user = current_user()
            .ok_or_else(|| EnvDictError::config("Could not determine the current user"))?;
        let root = find_root_recursively(&cwd);

        Ok(Self { user, cwd, root })
    }
}

/// Resolved placeholder values, keyed by name without braces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderTable {
    values: BTreeMap<String, String>,
}

impl PlaceholderTable {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Build the table for a raw mapping.
    ///
    /// Built-ins go in first, then raw top-level keys with a built-in name
    /// replace them. A raw string is expanded once against the built-ins so
    /// `user: '{{user}}'` yields the detected user; a null, sequence or
    /// mapping removes the name.
    pub fn build(raw: &Mapping, builtins: &Builtins, base_dir: Option<&Path>) -> Result<Self> {
        let mut values = BTreeMap::new();
        values.insert(USER.to_string(), builtins.user.clone());
        values.insert(CWD.to_string(), builtins.cwd.display().to_string());
        if let Some(root) = &builtins.root {
            values.insert(ROOT.to_string(), root.display().to_string());
        }
        if let Some(here) = base_dir {
            values.insert(HERE.to_string(), here.display().to_string());
        }

        let defaults = Expander::new(Arc::new(Self::new(values.clone())))?;

        for name in BUILTIN_NAMES {
            let Some(raw_value) = raw.get(*name) else {
                continue;
            };

            match raw_value {
                Value::String(s) => {
                    let expanded = defaults.expand_str(s, &[(*name).to_string()])?;
                    values.insert((*name).to_string(), expanded);
                }
                Value::Number(n) => {
                    values.insert((*name).to_string(), n.to_string());
                }
                Value::Bool(b) => {
                    values.insert((*name).to_string(), b.to_string());
                }
                _ => {
                    values.remove(*name);
                }
            }
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Substitutes placeholders in nested YAML values
#[derive(Debug, Clone)]
pub struct Expander {
    table: Arc<PlaceholderTable>,
    token: Regex,
}

impl Expander {
    pub fn new(table: Arc<PlaceholderTable>) -> Result<Self> {
        Ok(Self {
            table,
            token: Regex::new(TOKEN_PATTERN)?,
        })
    }

    pub fn table(&self) -> &PlaceholderTable {
        &self.table
    }

    /// Expand every value of a raw mapping
    pub fn expand_tree(&self, raw: &Mapping) -> Result<Mapping> {
        self.expand_mapping(raw, &[])
    }

    /// Expand a single value found at `key_path`; the path is used in errors only
    pub fn expand_value(&self, value: &Value, key_path: &[String]) -> Result<Value> {
        match value {
            Value::Mapping(map) => Ok(Value::Mapping(self.expand_mapping(map, key_path)?)),
            Value::Sequence(items) => {
                let mut expanded = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    expanded.push(self.expand_value(item, &child_path(key_path, format!("[{i}]")))?);
                }
                Ok(Value::Sequence(expanded))
            }
            Value::String(s) => Ok(Value::String(self.expand_str(s, key_path)?)),
            Value::Tagged(tagged) => {
                let mut tagged = tagged.clone();
                tagged.value = self.expand_value(&tagged.value, key_path)?;
                Ok(Value::Tagged(tagged))
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => Ok(value.clone()),
        }
    }

    fn expand_mapping(&self, map: &Mapping, key_path: &[String]) -> Result<Mapping> {
        let mut expanded = Mapping::with_capacity(map.len());
        for (key, value) in map {
            let path = child_path(key_path, key_segment(key));
            expanded.insert(key.clone(), self.expand_value(value, &path)?);
        }
        Ok(expanded)
    }

    /// Substitute every `{{name}}` token in `s`
    pub fn expand_str(&self, s: &str, key_path: &[String]) -> Result<String> {
        if !s.contains("{{") {
            return Ok(s.to_string());
        }

        let mut unknown = None;
        let expanded = self.token.replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            match self.table.get(name) {
                Some(value) => value.to_string(),
                None => {
                    unknown.get_or_insert_with(|| name.to_string());
                    caps[0].to_string()
                }
            }
        });

        if let Some(name) = unknown {
            let available: Vec<&str> = self.table.iter().map(|(k, _)| k).collect();
            return Err(EnvDictError::config(format!(
                "Error expanding placeholder \"{{{{{}}}}}\" in key \"{}\": no such placeholder \
                 (available: {})",
                name,
                key_path.join("."),
                available.join(", ")
            )));
        }

        Ok(expanded.into_owned())
    }
}

fn child_path(key_path: &[String], segment: String) -> Vec<String> {
    let mut path = key_path.to_vec();
    path.push(segment);
    path
}

fn key_segment(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}
