//! Service-manager seam.
//!
//! Every call takes the process environment as an explicit [`ProcessEnv`];
//! child processes are spawned with exactly that environment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use gatehouse_core::ProcessEnv;

use crate::error::{io_err, DaemonError};
use crate::launchd::LaunchdService;
use crate::systemd::SystemdUserService;

/// What to register with the service manager.
#[derive(Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub program_arguments: Vec<String>,
    /// The service's private environment. May hold the gateway token.
    pub environment: BTreeMap<String, String>,
    pub working_directory: Option<PathBuf>,
}

impl std::fmt::Debug for InstallRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallRequest")
            .field("program_arguments", &self.program_arguments)
            .field("environment", &self.environment.keys().collect::<Vec<_>>())
            .field("working_directory", &self.working_directory)
            .finish()
    }
}

pub trait ServiceManager {
    /// Short name for messages, e.g. `launchd`.
    fn name(&self) -> &'static str;

    /// Where the service definition lives.
    fn definition_path(&self) -> PathBuf;

    fn is_loaded(&self, env: &ProcessEnv) -> Result<bool, DaemonError>;

    fn install(&self, env: &ProcessEnv, request: &InstallRequest) -> Result<(), DaemonError>;

    fn uninstall(&self, env: &ProcessEnv) -> Result<(), DaemonError>;

    fn restart(&self, env: &ProcessEnv) -> Result<(), DaemonError>;

    /// Whether the user's login session bounds the service's lifetime.
    fn session_scoped(&self) -> bool {
        false
    }
}

/// Pick the service manager for the platform described by `env`.
pub fn resolve_service(
    home: &Path,
    env: &ProcessEnv,
) -> Result<Box<dyn ServiceManager>, DaemonError> {
    if env.is_macos() {
        Ok(Box::new(LaunchdService::new(home)))
    } else if env.is_linux() {
        Ok(Box::new(SystemdUserService::new(home)))
    } else {
        Err(DaemonError::Unsupported(env.os().to_string()))
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Run `program args…` with `env` and capture its output.
pub(crate) fn run_command(
    program: &str,
    args: &[&str],
    env: &ProcessEnv,
) -> Result<std::process::Output, DaemonError> {
    tracing::debug!(program, ?args, "running service command");
    Command::new(program)
        .args(args)
        .env_clear()
        .envs(env.vars())
        .output()
        .map_err(|e| io_err(program, e))
}

/// Like [`run_command`], but a non-zero exit is an error unless `ignore_failure`.
pub(crate) fn run_checked(
    manager: &'static str,
    program: &str,
    args: &[&str],
    env: &ProcessEnv,
    ignore_failure: bool,
) -> Result<(), DaemonError> {
    let output = run_command(program, args, env)?;
    if output.status.success() || ignore_failure {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(DaemonError::ServiceManager {
        manager,
        message: format!(
            "{program} {} (status {}): {stdout} {stderr}",
            args.join(" "),
            output.status
        ),
    })
}

/// Write a service definition readable only by the owner; it may embed a token.
pub(crate) fn write_private_file(path: &Path, contents: &str) -> Result<(), DaemonError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    fs::write(path, contents).map_err(|e| io_err(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}
