//! Preprocessing of directives that must not go through placeholder expansion

use crate::env::resolve::{resolve_module, ModuleLocator};
use crate::error::{EnvDictError, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directive holding the location of the project's module
pub const MODULE_KEY: &str = "_module";

/// Keys resolved before expansion; these win lookups over expanded data
pub type PreprocessedMapping = BTreeMap<String, PathBuf>;

/// Resolve the `_module` directive, if any.
///
/// Returns an empty mapping when `_module` is missing or falsy; the locator
/// and the filesystem are not touched in that case.
pub fn preprocess(
    raw: &Mapping,
    base_dir: Option<&Path>,
    locator: &dyn ModuleLocator,
) -> Result<PreprocessedMapping> {
    let mut preprocessed = PreprocessedMapping::new();

    let module = match raw.get(MODULE_KEY) {
        Some(value) if !is_falsy(value) => value,
        _ => return Ok(preprocessed),
    };

    let token = module.as_str().ok_or_else(|| {
        EnvDictError::config(format!(
            "_module must be a string, got {}",
            crate::env::source::type_name(module)
        ))
    })?;

    preprocessed.insert(
        MODULE_KEY.to_string(),
        resolve_module(token, base_dir, locator)?,
    );

    Ok(preprocessed)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(_) => false,
    }
}
