//! Environment dictionary module
//!
//! This module handles loading environment data from YAML files or
//! in-memory mappings, resolving the `_module` directive, expanding
//! `{{placeholder}}` tokens, and applying dotted-key overrides.

pub mod dict;
pub mod expand;
pub mod frozen;
pub mod preprocess;
pub mod resolve;
pub mod source;
pub mod validate;

pub use dict::{split_flattened_key, EnvDict, LoadOptions};
pub use expand::{Builtins, Expander, PlaceholderTable};
pub use frozen::FrozenValue;
pub use preprocess::{preprocess, PreprocessedMapping, MODULE_KEY};
pub use resolve::{resolve_module, ModuleLocator, SearchPathLocator, HERE_TOKEN};
pub use source::{load_from_source, EnvSource};
pub use validate::{KeyValidator, ReservedKeyValidator};
