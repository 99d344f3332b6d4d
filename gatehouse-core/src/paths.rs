use std::path::{Path, PathBuf};

pub const STATE_DIR: &str = ".gatehouse";
pub const CONFIG_FILE: &str = "gatehouse.yaml";
pub const NODE_IDENTITY_FILE: &str = "node.yaml";

pub fn state_root(home: &Path) -> PathBuf {
    home.join(STATE_DIR)
}

pub fn config_path(home: &Path) -> PathBuf {
    state_root(home).join(CONFIG_FILE)
}

pub fn node_identity_path(home: &Path) -> PathBuf {
    state_root(home).join(NODE_IDENTITY_FILE)
}

pub fn default_workspace(home: &Path) -> PathBuf {
    state_root(home).join("workspace")
}

pub fn logs_dir(home: &Path) -> PathBuf {
    state_root(home).join("logs")
}

/// Expand a leading `~` against `home`; other paths pass through.
pub fn resolve_user_path(input: &str, home: &Path) -> PathBuf {
    let trimmed = input.trim();
    if trimmed == "~" {
        return home.to_path_buf();
    }
    match trimmed.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(trimmed),
    }
}
