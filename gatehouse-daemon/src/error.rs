use std::path::PathBuf;

use gatehouse_core::{ConfigError, PromptError};
use thiserror::Error;

/// Error surface for service-manager calls and the lifecycle flow.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{manager} failed: {message}")]
    ServiceManager {
        manager: &'static str,
        message: String,
    },

    #[error("gateway service management is not supported on {0}")]
    Unsupported(String),

    #[error("cannot resolve gateway launch command: {0}")]
    LaunchCommand(String),

    #[error("cancelled by user")]
    Cancelled,

    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl From<PromptError> for DaemonError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => DaemonError::Cancelled,
            PromptError::Backend(message) => DaemonError::Prompt(message),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
