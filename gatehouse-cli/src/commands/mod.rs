pub mod config;
pub mod configure;
pub mod daemon;
pub mod node;

use anyhow::{Context, Result};

/// Current-thread runtime for the async parts of a command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

pub(crate) fn home() -> Result<std::path::PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}
