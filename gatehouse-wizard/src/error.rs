use std::path::PathBuf;

use gatehouse_core::{ConfigError, InvariantViolation, PromptError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WizardError {
    /// The user backed out of the current section.
    #[error("cancelled by user")]
    Cancelled,

    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Reconciliation let an impossible gateway combination through.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<PromptError> for WizardError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => WizardError::Cancelled,
            PromptError::Backend(message) => WizardError::Prompt(message),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WizardError {
    WizardError::Io {
        path: path.into(),
        source,
    }
}
