//! Layered environment dictionary
//!
//! An [`EnvDict`] keeps two layers: directives resolved before expansion
//! (currently `_module`) and the fully expanded data. Lookups consult the
//! directives first. Overrides never touch the receiver; they return a deep
//! copy in which only the replaced value was re-expanded.

use crate::env::expand::{Builtins, Expander, PlaceholderTable, CWD, HERE, ROOT, USER};
use crate::env::frozen::FrozenValue;
use crate::env::preprocess::{preprocess, PreprocessedMapping};
use crate::env::resolve::{ModuleLocator, SearchPathLocator};
use crate::env::source::{load_from_source, EnvSource};
use crate::env::validate::{KeyValidator, ReservedKeyValidator};
use crate::error::{EnvDictError, Result};
use crate::utils::discovery::{absolutize, host_name};
use crate::utils::repr::{elided_repr, ReprOptions};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix every flattened override key must start with
pub const FLATTENED_PREFIX: &str = "env";

/// Separator between segments of a flattened override key
pub const FLATTENED_SEPARATOR: &str = "__";

/// Knobs for [`EnvDict::with_options`]; every field has a host-derived default
#[derive(Default)]
pub struct LoadOptions {
    /// Directory for `{{here}}`; defaults to the source file's parent
    pub base_dir: Option<PathBuf>,
    /// Built-in placeholder values; detected from the host when `None`
    pub builtins: Option<Builtins>,
    /// Where upward file searches start; the working directory when `None`
    pub search_from: Option<PathBuf>,
    /// Host name used for `env.<host>.yaml`
    pub host_name: Option<String>,
    pub locator: Option<Box<dyn ModuleLocator>>,
    pub validator: Option<Box<dyn KeyValidator>>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = Some(builtins);
        self
    }

    pub fn search_from<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.search_from = Some(dir.into());
        self
    }

    pub fn host_name<S: Into<String>>(mut self, host: S) -> Self {
        self.host_name = Some(host.into());
        self
    }

    pub fn locator(mut self, locator: Box<dyn ModuleLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn validator(mut self, validator: Box<dyn KeyValidator>) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Expanded environment with preprocessed directives layered on top
#[derive(Debug, Clone)]
pub struct EnvDict {
    path_to_env: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    preprocessed: PreprocessedMapping,
    expander: Expander,
    data: Mapping,
}

impl EnvDict {
    /// Load from `source`, detecting built-in placeholders from the host
    pub fn new<S: Into<EnvSource>>(source: S, base_dir: Option<&Path>) -> Result<Self> {
        let mut options = LoadOptions::new();
        options.base_dir = base_dir.map(Path::to_path_buf);
        Self::with_options(source, options)
    }

    /// Dictionary holding only the built-in placeholders
    pub fn default_placeholders(base_dir: Option<&Path>) -> Result<Self> {
        Self::new(Mapping::new(), base_dir)
    }

    pub fn with_options<S: Into<EnvSource>>(source: S, options: LoadOptions) -> Result<Self> {
        let search_from = match options.search_from {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let host = options.host_name.unwrap_or_else(host_name);
        let builtins = match options.builtins {
            Some(builtins) => builtins,
            None => Builtins::detect()?,
        };

        let loaded = load_from_source(source.into(), &search_from, &host)?;
        let caller_base_dir = options.base_dir.as_deref().map(absolutize).transpose()?;

        let mut raw = default_keys(&builtins, caller_base_dir.is_some());
        for (key, value) in loaded.raw {
            raw.insert(key, value);
        }

        match &options.validator {
            Some(validator) => validator.validate(&raw)?,
            None => ReservedKeyValidator.validate(&raw)?,
        }

        let base_dir = caller_base_dir.or_else(|| {
            loaded
                .path
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
        });

        // `_module: {{here}}` is relative to the file it was written in
        let module_base = loaded
            .path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| base_dir.clone());

        let preprocessed = match &options.locator {
            Some(locator) => preprocess(&raw, module_base.as_deref(), &**locator)?,
            None => preprocess(&raw, module_base.as_deref(), &SearchPathLocator::from_env()?)?,
        };

        let table = PlaceholderTable::build(&raw, &builtins, base_dir.as_deref())?;
        debug!(
            "Placeholders available: {:?}",
            table.iter().map(|(k, _)| k).collect::<Vec<_>>()
        );
        let expander = Expander::new(Arc::new(table))?;
        let data = expander.expand_tree(&raw)?;

        info!("Loaded env with {} top-level keys", data.len());

        Ok(Self {
            path_to_env: loaded.path,
            base_dir,
            preprocessed,
            expander,
            data,
        })
    }

    /// Absolute path of the file this env was loaded from
    pub fn path_to_env(&self) -> Option<&Path> {
        self.path_to_env.as_deref()
    }

    /// Directory used for `{{here}}`
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn placeholders(&self) -> &PlaceholderTable {
        self.expander.table()
    }

    /// Look up a top-level key; preprocessed directives take priority
    pub fn get(&self, key: &str) -> Result<FrozenValue<'_>> {
        if let Some(path) = self.preprocessed.get(key) {
            return Ok(FrozenValue::Path(path));
        }

        self.data
            .get(key)
            .map(FrozenValue::Node)
            .ok_or_else(|| EnvDictError::key_not_found(key, self.repr()))
    }

    /// Field-style access; same lookup as [`get`](Self::get)
    pub fn attr(&self, name: &str) -> Result<FrozenValue<'_>> {
        self.get(name)
    }

    /// Follow a dotted path such as `db.host` through nested mappings
    pub fn get_dotted(&self, dotted: &str) -> Result<FrozenValue<'_>> {
        let mut parts = dotted.split('.');
        let first = parts.next().unwrap_or_default();
        parts.try_fold(self.get(first)?, |value, key| value.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.preprocessed.contains_key(key) || self.data.contains_key(key)
    }

    /// Top-level keys of the expanded data, in source order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().filter_map(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The expanded data as a YAML value, with preprocessed directives on top
    pub fn to_value(&self) -> Value {
        let mut data = self.data.clone();
        for (key, path) in &self.preprocessed {
            data.insert(
                Value::String(key.clone()),
                Value::String(path.display().to_string()),
            );
        }
        Value::Mapping(data)
    }

    /// Copy with the value at `keys` replaced by the expansion of `value`
    pub fn replace_at_path<K: AsRef<str>>(&self, value: Value, keys: &[K]) -> Result<Self> {
        let mut copy = self.clone();
        copy.replace_value(value, keys)?;
        Ok(copy)
    }

    /// Copy with the value at `env__a__b` replaced
    pub fn replace_flattened_key(&self, value: Value, flattened_key: &str) -> Result<Self> {
        let keys = split_flattened_key(flattened_key)?;
        self.replace_at_path(value, &keys)
    }

    /// Copy with several flattened keys replaced, applied in order
    pub fn replace_many<I, K>(&self, to_replace: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut copy = self.clone();
        for (flattened_key, value) in to_replace {
            let keys = split_flattened_key(flattened_key.as_ref())?;
            copy.replace_value(value, &keys)?;
        }
        Ok(copy)
    }

    fn replace_value<K: AsRef<str>>(&mut self, value: Value, keys: &[K]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let dotted = keys.join(".");
        let Some((key_to_edit, parents)) = keys.split_last() else {
            return Err(EnvDictError::invalid_argument("Key path to replace cannot be empty"));
        };

        let expander = &self.expander;
        let mut dict_to_edit = &mut self.data;
        for key in parents {
            dict_to_edit = match lookup_mut(dict_to_edit, key) {
                Some(Value::Mapping(map)) => map,
                _ => return Err(EnvDictError::missing_override(dotted)),
            };
        }

        let Some(slot) = lookup_mut(dict_to_edit, key_to_edit) else {
            return Err(EnvDictError::missing_override(dotted));
        };
        *slot = expander.expand_value(&value, &keys)?;

        debug!("Replaced env value at {}", dotted);
        Ok(())
    }

    fn repr(&self) -> String {
        format!(
            "EnvDict({})",
            elided_repr(&Value::Mapping(self.data.clone()), &ReprOptions::default())
        )
    }
}

impl fmt::Display for EnvDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

/// Raw entries for the built-in placeholders, merged under the loaded data
fn default_keys(builtins: &Builtins, include_here: bool) -> Mapping {
    let mut raw = Mapping::new();
    let mut add = |name: &str| {
        raw.insert(
            Value::String(name.to_string()),
            Value::String(format!("{{{{{}}}}}", name)),
        );
    };

    add(USER);
    add(CWD);
    if builtins.root.is_some() {
        add(ROOT);
    }
    if include_here {
        add(HERE);
    }

    raw
}

/// Convert `env__a__b` into `["a", "b"]`
pub fn split_flattened_key(flattened_key: &str) -> Result<Vec<String>> {
    let mut parts = flattened_key.split(FLATTENED_SEPARATOR);

    if parts.next() != Some(FLATTENED_PREFIX) {
        return Err(EnvDictError::invalid_argument(format!(
            "Flattened keys must start with {}{}, got \"{}\"",
            FLATTENED_PREFIX, FLATTENED_SEPARATOR, flattened_key
        )));
    }

    let keys: Vec<String> = parts.map(str::to_string).collect();
    if keys.is_empty() {
        return Err(EnvDictError::invalid_argument(format!(
            "Flattened key \"{}\" does not name any key",
            flattened_key
        )));
    }

    Ok(keys)
}

/// String keys first; numeric segments also match integer keys
fn lookup_mut<'m>(map: &'m mut Mapping, key: &str) -> Option<&'m mut Value> {
    if map.contains_key(key) {
        return map.get_mut(key);
    }

    let number = key.parse::<i64>().ok()?;
    map.get_mut(Value::from(number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::resolve::MockModuleLocator;
    use crate::env::validate::MockKeyValidator;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn options() -> LoadOptions {
        LoadOptions::new()
            .builtins(Builtins::new("alice", "/work", None))
            .host_name("test-host")
    }

    fn load(yaml: &str) -> EnvDict {
        EnvDict::with_options(mapping(yaml), options()).unwrap()
    }

    #[test]
    fn test_module_here_and_nested_lookup() {
        let env = EnvDict::with_options(
            mapping("a:\n  b: 1\n_module: '{{here}}'\n"),
            options().base_dir("/proj"),
        )
        .unwrap();

        assert_eq!(env.get("_module").unwrap().as_path(), Some(PathBuf::from("/proj")));
        assert_eq!(env.get("a").unwrap().get("b").unwrap().as_i64(), Some(1));
        assert_eq!(env.attr("a").unwrap().attr("b").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn test_user_placeholder() {
        let env = load("path: '{{user}}/data'\n");
        assert_eq!(env.get("path").unwrap().as_str(), Some("alice/data"));
        assert_eq!(env.get("user").unwrap().as_str(), Some("alice"));
        assert_eq!(env.get("cwd").unwrap().as_str(), Some("/work"));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let err = EnvDict::with_options(mapping("x: '{{missing}}'\n"), options()).unwrap_err();
        assert!(matches!(err, EnvDictError::ConfigError { .. }));
    }

    #[test]
    fn test_here_key_only_when_caller_passes_base_dir() {
        assert!(!load("a: 1\n").contains_key("here"));

        let env = EnvDict::with_options(mapping("a: 1\n"), options().base_dir("/proj")).unwrap();
        assert_eq!(env.get("here").unwrap().as_str(), Some("/proj"));
    }

    #[test]
    fn test_root_key_when_root_detected() {
        let options = LoadOptions::new()
            .builtins(Builtins::new("alice", "/work", Some(PathBuf::from("/repo"))))
            .host_name("test-host");
        let env = EnvDict::with_options(mapping("data: '{{root}}/data'\n"), options).unwrap();

        assert_eq!(env.get("root").unwrap().as_str(), Some("/repo"));
        assert_eq!(env.get("data").unwrap().as_str(), Some("/repo/data"));
    }

    #[test]
    fn test_explicit_user_key_wins() {
        let env = load("user: bob\npath: '/home/{{user}}'\n");
        assert_eq!(env.get("user").unwrap().as_str(), Some("bob"));
        assert_eq!(env.get("path").unwrap().as_str(), Some("/home/bob"));
    }

    #[test]
    fn test_missing_key_error_carries_repr() {
        let env = load("a: 1\n");
        let err = env.get("zzz").unwrap_err();
        match &err {
            EnvDictError::KeyNotFound { key, .. } => assert_eq!(key, "zzz"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("EnvDict({"));
    }

    #[test]
    fn test_preprocessed_wins_over_data() {
        let mut locator = MockModuleLocator::new();
        locator
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/site/my_pkg")));

        let env = EnvDict::with_options(
            mapping("_module: my_pkg\n"),
            options().locator(Box::new(locator)),
        )
        .unwrap();

        assert_eq!(env.get("_module").unwrap(), FrozenValue::Path(Path::new("/site/my_pkg")));
    }

    #[test]
    fn test_to_value_includes_preprocessed_entries() {
        let mut locator = MockModuleLocator::new();
        locator
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/site/my_pkg")));

        let env = EnvDict::with_options(
            mapping("_module: my_pkg
a: 1
"),
            options().locator(Box::new(locator)),
        )
        .unwrap();

        let value = env.to_value();
        assert_eq!(value["_module"], Value::from("/site/my_pkg"));
        assert_eq!(value["a"], Value::from(1));
    }

    #[test]
    fn test_validator_receives_merged_keys() {
        let mut validator = MockKeyValidator::new();
        validator
            .expect_validate()
            .withf(|raw| raw.contains_key("user") && raw.contains_key("a"))
            .times(1)
            .returning(|_| Err(EnvDictError::validation("rejected")));

        let err = EnvDict::with_options(mapping("a: 1\n"), options().validator(Box::new(validator)))
            .unwrap_err();
        assert!(matches!(err, EnvDictError::ValidationError(_)));
    }

    #[test]
    fn test_replace_at_path_returns_copy() {
        let env = load("a:\n  b: 1\n");
        let replaced = env.replace_at_path(Value::from(2), &["a", "b"]).unwrap();

        assert_eq!(replaced.get("a").unwrap().get("b").unwrap().as_i64(), Some(2));
        assert_eq!(env.get("a").unwrap().get("b").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn test_replace_expands_new_value() {
        let env = load("a:\n  b: x\n");
        let replaced = env
            .replace_at_path(Value::from("{{user}}-{{cwd}}"), &["a", "b"])
            .unwrap();
        assert_eq!(replaced.get_dotted("a.b").unwrap().as_str(), Some("alice-/work"));
    }

    #[test]
    fn test_replace_missing_key_fails() {
        let env = load("a:\n  b: 1\n");

        let err = env.replace_at_path(Value::from(2), &["a", "z"]).unwrap_err();
        assert!(matches!(err, EnvDictError::KeyNotFound { .. }));

        let err = env.replace_at_path(Value::from(2), &["x", "b"]).unwrap_err();
        assert!(matches!(err, EnvDictError::KeyNotFound { .. }));

        let err = env.replace_at_path(Value::from(2), &["a", "b", "c"]).unwrap_err();
        assert!(matches!(err, EnvDictError::KeyNotFound { .. }));
    }

    #[test]
    fn test_replace_missing_key_reported_before_expansion() {
        let env = load("a:
  b: 1
");

        let err = env
            .replace_at_path(Value::from("{{nope}}"), &["a", "z"])
            .unwrap_err();
        assert!(matches!(err, EnvDictError::KeyNotFound { .. }));
    }

    #[test]
    fn test_replace_empty_path_is_invalid() {
        let env = load("a: 1\n");
        let empty: [&str; 0] = [];
        let err = env.replace_at_path(Value::from(2), &empty).unwrap_err();
        assert!(matches!(err, EnvDictError::InvalidArgument(_)));
    }

    #[test]
    fn test_replace_flattened_key() {
        let env = load("a:\n  b: 1\n");
        let replaced = env.replace_flattened_key(Value::from(3), "env__a__b").unwrap();
        assert_eq!(replaced.get_dotted("a.b").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn test_flattened_key_requires_env_prefix() {
        let env = load("a:\n  b: 1\n");
        for key in ["a__b", "environment__a", "ENV__a", "env"] {
            let err = env.replace_flattened_key(Value::from(3), key).unwrap_err();
            assert!(matches!(err, EnvDictError::InvalidArgument(_)), "{key}");
        }
        assert_eq!(env.get_dotted("a.b").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn test_replace_many() {
        let env = load("a:\n  b: 1\nc: x\n");
        let replaced = env
            .replace_many(vec![
                ("env__a__b", Value::from(5)),
                ("env__c", Value::from("{{user}}")),
            ])
            .unwrap();

        assert_eq!(replaced.get_dotted("a.b").unwrap().as_i64(), Some(5));
        assert_eq!(replaced.get("c").unwrap().as_str(), Some("alice"));
        assert_eq!(env.get("c").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_replace_many_failure_leaves_original() {
        let env = load("a:\n  b: 1\n");
        let result = env.replace_many(vec![
            ("env__a__b", Value::from(5)),
            ("env__a__missing", Value::from(6)),
        ]);

        assert!(result.is_err());
        assert_eq!(env.get_dotted("a.b").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn test_replace_integer_keyed_entry() {
        let env = load("ports:\n  1: 8080\n");
        let replaced = env.replace_flattened_key(Value::from(9090), "env__ports__1").unwrap();
        assert_eq!(
            replaced.get("ports").unwrap().to_value(),
            serde_yaml::from_str::<Value>("1: 9090").unwrap()
        );
    }

    #[test]
    fn test_split_flattened_key() {
        assert_eq!(split_flattened_key("env__a__b").unwrap(), vec!["a", "b"]);
        assert!(split_flattened_key("a__b").is_err());
    }
}
