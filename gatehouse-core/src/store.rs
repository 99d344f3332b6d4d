//! YAML config store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gatehouse/            (mode 0700)
//!   gatehouse.yaml         (mode 0600)
//!   node.yaml              (mode 0600, client node identity)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Reads never fail on malformed content: they return a [`ConfigSnapshot`]
//! with `valid == false` and the parse/validation issues, so the caller can
//! decide whether to start fresh.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{io_err, ConfigError};
use crate::paths::{config_path, state_root};
use crate::reconcile::check_invariants;
use crate::types::{AuthMode, RuntimeConfig};

/// One problem found in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted field path, or `<root>` for whole-file problems.
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// What the store found on disk.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub path: PathBuf,
    pub exists: bool,
    pub valid: bool,
    /// Parsed config when valid; defaults otherwise.
    pub config: RuntimeConfig,
    pub issues: Vec<ConfigIssue>,
}

// ---------------------------------------------------------------------------
// 1. Read
// ---------------------------------------------------------------------------

pub fn read_snapshot_at(home: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let path = config_path(home);
    if !path.exists() {
        return Ok(ConfigSnapshot {
            path,
            exists: false,
            valid: true,
            config: RuntimeConfig::default(),
            issues: vec![],
        });
    }

    let contents = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let parsed: Result<RuntimeConfig, _> = if contents.trim().is_empty() {
        Ok(RuntimeConfig::default())
    } else {
        serde_yaml::from_str(&contents)
    };

    let (config, issues) = match parsed {
        Ok(config) => {
            let issues = validate(&config);
            (config, issues)
        }
        Err(err) => {
            let location = err
                .location()
                .map(|loc| format!("line {}", loc.line()))
                .unwrap_or_else(|| "<root>".to_string());
            tracing::warn!(path = %path.display(), error = %err, "config failed to parse");
            (
                RuntimeConfig::default(),
                vec![ConfigIssue::new(location, err.to_string())],
            )
        }
    };

    Ok(ConfigSnapshot {
        path,
        exists: true,
        valid: issues.is_empty(),
        config,
        issues,
    })
}

/// `read_snapshot_at` convenience wrapper.
pub fn read_snapshot() -> Result<ConfigSnapshot, ConfigError> {
    read_snapshot_at(&home()?)
}

/// Structural checks serde cannot express.
pub fn validate(config: &RuntimeConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let gateway = &config.gateway;

    if gateway.port == 0 {
        issues.push(ConfigIssue::new("gateway.port", "must be between 1 and 65535"));
    }
    match gateway.auth.mode {
        AuthMode::Token if is_blank(gateway.auth.token.as_deref()) => {
            issues.push(ConfigIssue::new(
                "gateway.auth.token",
                "required when auth mode is token",
            ));
        }
        AuthMode::Password if is_blank(gateway.auth.password.as_deref()) => {
            issues.push(ConfigIssue::new(
                "gateway.auth.password",
                "required when auth mode is password",
            ));
        }
        _ => {}
    }
    if let Err(violation) = check_invariants(gateway.bind, gateway.auth.mode, gateway.exposure.mode)
    {
        issues.push(ConfigIssue::new("gateway", violation.0));
    }
    let mut seen = std::collections::HashSet::new();
    for profile in &config.auth_profiles {
        if !seen.insert(&profile.profile_id) {
            issues.push(ConfigIssue::new(
                "auth_profiles",
                format!("duplicate profile id '{}'", profile.profile_id),
            ));
        }
    }
    issues
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(str::trim).unwrap_or_default().is_empty()
}

// ---------------------------------------------------------------------------
// 2. Write (atomic)
// ---------------------------------------------------------------------------

/// Atomically replace `<home>/.gatehouse/gatehouse.yaml` with `config`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn write_at(home: &Path, config: &RuntimeConfig) -> Result<PathBuf, ConfigError> {
    let issues = validate(config);
    if let Some(first) = issues.first() {
        return Err(ConfigError::Invalid(format!("{}: {}", first.path, first.message)));
    }
    let path = config_path(home);
    write_yaml_at(home, &path, config)?;
    tracing::debug!(path = %path.display(), "config written");
    Ok(path)
}

/// `write_at` convenience wrapper.
pub fn write(config: &RuntimeConfig) -> Result<PathBuf, ConfigError> {
    write_at(&home()?, config)
}

/// Load an auxiliary YAML document from the state root, if present.
pub fn load_yaml_at<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(Some(serde_yaml::from_str(&contents)?))
}

/// Atomically write any serializable document under the state root.
pub fn write_yaml_at<T: Serialize>(home: &Path, path: &Path, value: &T) -> Result<(), ConfigError> {
    ensure_state_root(home)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.yaml".to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let yaml = serde_yaml::to_string(value)?;
    let written = fs::write(&tmp_path, yaml)
        .map_err(|e| io_err(&tmp_path, e))
        .and_then(|()| set_file_permissions(&tmp_path))
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| io_err(path, e)));
    if written.is_err() && tmp_path.exists() {
        if let Err(err) = fs::remove_file(&tmp_path) {
            tracing::warn!(path = %tmp_path.display(), error = %err, "could not remove temp file");
        }
    }
    written
}

/// `<home>/.gatehouse/`, created if absent and kept at mode `0700`.
pub fn ensure_state_root(home: &Path) -> Result<PathBuf, ConfigError> {
    let dir = state_root(home);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }
    set_dir_permissions(&dir)?;
    Ok(dir)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700)).map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
