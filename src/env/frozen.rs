//! Read-only views over values held by an [`EnvDict`](crate::env::EnvDict)

use crate::error::{EnvDictError, Result};
use crate::utils::repr::{elided_repr, ReprOptions};
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Borrowed, immutable view of an environment value.
///
/// Nested mappings and sequences are navigated with [`get`](Self::get),
/// [`attr`](Self::attr) and [`at`](Self::at); nothing hands out mutable
/// access to the underlying data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrozenValue<'a> {
    /// A preprocessed directive resolved to a path
    Path(&'a Path),
    /// A node of the expanded data
    Node(&'a Value),
}

impl<'a> FrozenValue<'a> {
    /// Look up `key` in a mapping value
    pub fn get(&self, key: &str) -> Result<FrozenValue<'a>> {
        match self {
            FrozenValue::Node(Value::Mapping(map)) => map
                .get(key)
                .map(FrozenValue::Node)
                .ok_or_else(|| EnvDictError::key_not_found(key, self.repr())),
            _ => Err(EnvDictError::key_not_found(key, self.repr())),
        }
    }

    /// Field-style access; same lookup as [`get`](Self::get)
    pub fn attr(&self, name: &str) -> Result<FrozenValue<'a>> {
        self.get(name)
    }

    /// Element `index` of a sequence value
    pub fn at(&self, index: usize) -> Result<FrozenValue<'a>> {
        match self {
            FrozenValue::Node(Value::Sequence(items)) => items
                .get(index)
                .map(FrozenValue::Node)
                .ok_or_else(|| EnvDictError::key_not_found(format!("[{index}]"), self.repr())),
            _ => Err(EnvDictError::key_not_found(format!("[{index}]"), self.repr())),
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            FrozenValue::Node(value) => value.as_str(),
            FrozenValue::Path(path) => path.to_str(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.node().and_then(Value::as_i64)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.node().and_then(Value::as_u64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.node().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.node().and_then(Value::as_bool)
    }

    /// The value as a filesystem path: directives directly, strings converted
    pub fn as_path(&self) -> Option<PathBuf> {
        match self {
            FrozenValue::Path(path) => Some(path.to_path_buf()),
            FrozenValue::Node(value) => value.as_str().map(PathBuf::from),
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, FrozenValue::Node(Value::Mapping(_)))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, FrozenValue::Node(Value::Sequence(_)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FrozenValue::Node(Value::Null))
    }

    /// Keys of a mapping value, empty for anything else
    pub fn keys(&self) -> Vec<&'a str> {
        match self {
            FrozenValue::Node(Value::Mapping(map)) => map.keys().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of entries or elements; scalars count as zero
    pub fn len(&self) -> usize {
        match self {
            FrozenValue::Node(Value::Mapping(map)) => map.len(),
            FrozenValue::Node(Value::Sequence(items)) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned copy of the value; paths become strings
    pub fn to_value(&self) -> Value {
        match self {
            FrozenValue::Node(value) => (*value).clone(),
            FrozenValue::Path(path) => Value::String(path.display().to_string()),
        }
    }

    fn node(&self) -> Option<&'a Value> {
        match self {
            FrozenValue::Node(value) => Some(*value),
            FrozenValue::Path(_) => None,
        }
    }

    fn repr(&self) -> String {
        elided_repr(&self.to_value(), &ReprOptions::default())
    }
}

impl fmt::Display for FrozenValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrozenValue::Path(path) => write!(f, "{}", path.display()),
            FrozenValue::Node(Value::String(s)) => write!(f, "{}", s),
            FrozenValue::Node(value) => write!(f, "{}", elided_repr(value, &ReprOptions::default())),
        }
    }
}

impl PartialEq<Value> for FrozenValue<'_> {
    fn eq(&self, other: &Value) -> bool {
        match self {
            FrozenValue::Node(value) => *value == other,
            FrozenValue::Path(path) => other.as_str().map(Path::new) == Some(*path),
        }
    }
}
