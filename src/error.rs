use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for envdict operations
#[derive(Debug, Error)]
pub enum EnvDictError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{message}")]
    KeyNotFound { key: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

impl EnvDictError {
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError {
            message: msg.into(),
            source: None,
        }
    }

    /// Configuration error that keeps the underlying failure as its source
    pub fn config_with_source<S, E>(msg: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Lookup of a key that is absent; `repr` is a bounded rendering of the container
    pub fn key_not_found<K: Into<String>, R: AsRef<str>>(key: K, repr: R) -> Self {
        let key = key.into();
        Self::KeyNotFound {
            message: format!("{} object has no key '{}'", repr.as_ref(), key),
            key,
        }
    }

    /// Override that targets a key path not present in the dictionary
    pub fn missing_override<K: Into<String>>(dotted_path: K) -> Self {
        let key = dotted_path.into();
        Self::KeyNotFound {
            message: format!(
                "Trying to replace key \"{}\" in env, but it does not exist",
                key
            ),
            key,
        }
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }
}

/// Result type alias for envdict operations
pub type Result<T> = std::result::Result<T, EnvDictError>;

impl From<serde_json::Error> for EnvDictError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}
