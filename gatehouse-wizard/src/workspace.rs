//! Workspace section: where agent sessions live on disk.

use std::fs;
use std::path::{Path, PathBuf};

use gatehouse_core::paths::{default_workspace, resolve_user_path};
use gatehouse_core::{Prompter, RuntimeConfig, TextPrompt};

use crate::error::{io_err, WizardError};

pub const SESSIONS_DIR: &str = "sessions";

/// Current workspace directory for `config`, or the default under `home`.
pub fn current(config: &RuntimeConfig, home: &Path) -> PathBuf {
    config
        .workspace
        .clone()
        .unwrap_or_else(|| default_workspace(home))
}

/// Resolve the typed directory (blank keeps the default) and record it.
pub fn apply(config: &RuntimeConfig, input: &str, home: &Path) -> (RuntimeConfig, PathBuf) {
    let dir = if input.trim().is_empty() {
        default_workspace(home)
    } else {
        resolve_user_path(input, home)
    };
    let mut next = config.clone();
    next.workspace = Some(dir.clone());
    (next, dir)
}

/// Create the workspace and its `sessions/` directory.
pub fn ensure_dirs(dir: &Path) -> Result<PathBuf, WizardError> {
    let sessions = dir.join(SESSIONS_DIR);
    fs::create_dir_all(&sessions).map_err(|e| io_err(&sessions, e))?;
    Ok(sessions)
}

pub fn collect(
    config: &RuntimeConfig,
    home: &Path,
    prompter: &mut dyn Prompter,
) -> Result<RuntimeConfig, WizardError> {
    let initial = current(config, home);
    let input = prompter.text(
        TextPrompt::new("Workspace directory").initial(initial.display().to_string()),
    )?;
    let (next, dir) = apply(config, &input, home);
    let sessions = ensure_dirs(&dir)?;
    prompter.log(&format!("Sessions: {}", sessions.display()));
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tilde_and_blank_resolve_against_home() {
        let home = Path::new("/home/tester");
        let (cfg, dir) = apply(&RuntimeConfig::default(), "~/agents", home);
        assert_eq!(dir, PathBuf::from("/home/tester/agents"));
        assert_eq!(cfg.workspace, Some(dir));

        let (_, blank) = apply(&RuntimeConfig::default(), "  ", home);
        assert_eq!(blank, default_workspace(home));
    }

    #[test]
    fn ensure_creates_sessions_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let sessions = ensure_dirs(&tmp.path().join("ws")).expect("create");
        assert!(sessions.is_dir());
        // Idempotent.
        ensure_dirs(&tmp.path().join("ws")).expect("again");
    }
}
