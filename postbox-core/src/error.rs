//! Error types for postbox-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading, writing or checking `config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path being read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode config as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file exists but is not a valid config. `source` carries the line.
    #[error("config at {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no home directory to find ~/.postbox in; set $HOME")]
    HomeNotFound,

    /// A field failed validation after a successful parse.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
