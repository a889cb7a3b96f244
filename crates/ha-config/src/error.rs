//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("secret '{key}' not found in secrets.yaml")]
    SecretNotFound { key: String },

    #[error("environment variable '{var}' not set")]
    EnvVarNotFound { var: String },

    #[error("circular include detected: {path}")]
    CircularInclude { path: PathBuf },

    /// A tag argument or section has the wrong shape
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// The configuration parsed but describes something impossible
    #[error("configuration validation failed: {message}")]
    ValidationFailed { message: String },
}
