//! Key validation for raw environment data

use crate::error::{EnvDictError, Result};
use serde_yaml::{Mapping, Value};

#[cfg(test)]
use mockall::automock;

/// Directives that may appear as underscore-prefixed top-level keys
pub const KNOWN_DIRECTIVES: &[&str] = &["_module"];

/// Checks the top-level keys of a raw mapping before preprocessing
#[cfg_attr(test, automock)]
pub trait KeyValidator {
    fn validate(&self, raw: &Mapping) -> Result<()>;
}

/// Default validator.
///
/// Keys must be strings, underscore-prefixed keys must be known directives,
/// and no key may contain `__` since that separates flattened override keys.
#[derive(Debug, Clone, Default)]
pub struct ReservedKeyValidator;

impl KeyValidator for ReservedKeyValidator {
    fn validate(&self, raw: &Mapping) -> Result<()> {
        for key in raw.keys() {
            let key = match key {
                Value::String(s) => s.as_str(),
                other => {
                    return Err(EnvDictError::validation(format!(
                        "Top-level keys must be strings, got {:?}",
                        other
                    )))
                }
            };

            if key.starts_with('_') && !KNOWN_DIRECTIVES.contains(&key) {
                return Err(EnvDictError::validation(format!(
                    "Error validating env. Top-level keys cannot start with an underscore, \
                     except for {:?}. Got: \"{}\"",
                    KNOWN_DIRECTIVES, key
                )));
            }

            if key.contains("__") {
                return Err(EnvDictError::validation(format!(
                    "Error validating env. Keys cannot contain \"__\", got: \"{}\"",
                    key
                )));
            }
        }

        Ok(())
    }
}
