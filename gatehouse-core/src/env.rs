//! Explicit process environment.
//!
//! Service-manager calls and environment probes take a [`ProcessEnv`] value
//! instead of reading `std::env` themselves, so tests can describe a headless
//! Linux box or an SSH session without touching the real environment.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnv {
    vars: BTreeMap<String, String>,
    os: String,
}

impl ProcessEnv {
    /// Snapshot of the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
            os: std::env::consts::OS.to_string(),
        }
    }

    pub fn from_pairs<K, V>(os: &str, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            os: os.to_string(),
        }
    }

    /// Value of `key`, treating empty strings as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every variable, for handing to a child process.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Search `PATH` for an executable named `name`.
    pub fn which(&self, name: &str) -> Option<std::path::PathBuf> {
        let path = self.get("PATH")?;
        std::env::split_paths(path)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn is_macos(&self) -> bool {
        self.os == "macos"
    }

    pub fn is_linux(&self) -> bool {
        self.os == "linux"
    }

    pub fn is_root(&self) -> bool {
        self.user() == Some("root")
    }

    /// Login name of the invoking user.
    pub fn user(&self) -> Option<&str> {
        self.get("USER").or_else(|| self.get("LOGNAME"))
    }

    /// Remote or headless session: the user cannot see a browser opened here.
    pub fn is_remote(&self) -> bool {
        const REMOTE_MARKERS: [&str; 5] = [
            "SSH_CLIENT",
            "SSH_TTY",
            "SSH_CONNECTION",
            "REMOTE_CONTAINERS",
            "CODESPACES",
        ];
        if REMOTE_MARKERS.iter().any(|key| self.has(key)) {
            return true;
        }
        self.is_linux() && !self.has("DISPLAY") && !self.has("WAYLAND_DISPLAY")
    }

    /// A local browser can be opened from this session.
    pub fn can_open_browser(&self) -> bool {
        !self.is_remote() && matches!(self.os.as_str(), "macos" | "windows" | "linux")
    }
}
