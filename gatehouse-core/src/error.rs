//! Error types for gatehouse-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from config store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// Refused to write a config that fails validation.
    #[error("refusing to write invalid config: {0}")]
    Invalid(String),
}

/// A combination of gateway settings that reconciliation should have made
/// unreachable. Observing one is a programming error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gateway invariant violated: {0}")]
pub struct InvariantViolation(pub &'static str);

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
