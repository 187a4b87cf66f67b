//! envdict - layered environment dictionaries
//!
//! Loads YAML environment files (or in-memory mappings), expands
//! `{{placeholder}}` tokens, resolves the `_module` directive and supports
//! copy-on-write overrides through flattened `env__a__b` keys.

pub mod cli;
pub mod env;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use env::{EnvDict, EnvSource, FrozenValue, LoadOptions};
pub use error::{EnvDictError, Result};
