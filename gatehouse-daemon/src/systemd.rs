//! systemd user unit for Linux hosts.

use std::fs;
use std::path::{Path, PathBuf};

use gatehouse_core::ProcessEnv;

use crate::error::{io_err, DaemonError};
use crate::paths::{systemd_unit_path, SYSTEMD_UNIT};
use crate::service::{run_checked, run_command, write_private_file, InstallRequest, ServiceManager};

const MANAGER: &str = "systemd";

/// Render the `[Unit]/[Service]/[Install]` file for the gateway.
pub fn generate_unit(request: &InstallRequest) -> String {
    let exec_start = request
        .program_arguments
        .iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ");

    let mut unit = String::new();
    unit.push_str("[Unit]\n");
    unit.push_str("Description=Gatehouse gateway\n");
    unit.push_str("After=network-online.target\n");
    unit.push_str("Wants=network-online.target\n\n");

    unit.push_str("[Service]\n");
    unit.push_str("Type=simple\n");
    unit.push_str(&format!("ExecStart={exec_start}\n"));
    if let Some(dir) = &request.working_directory {
        unit.push_str(&format!("WorkingDirectory={}\n", quote_arg(&dir.display().to_string())));
    }
    for (key, value) in &request.environment {
        unit.push_str(&format!("Environment={}\n", quote_arg(&format!("{key}={value}"))));
    }
    unit.push_str("Restart=on-failure\n");
    unit.push_str("RestartSec=5\n");
    unit.push_str("KillMode=process\n\n");

    unit.push_str("[Install]\n");
    unit.push_str("WantedBy=default.target\n");
    unit
}

/// Quote for systemd's command-line and `Environment=` parsing.
fn quote_arg(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\\' | '\'' | '$' | '%' | ';'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "$$")
        .replace('%', "%%");
    format!("\"{escaped}\"")
}

#[derive(Debug, Clone)]
pub struct SystemdUserService {
    home: PathBuf,
}

impl SystemdUserService {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    fn systemctl(&self, args: &[&str], env: &ProcessEnv, ignore_failure: bool) -> Result<(), DaemonError> {
        let mut full = vec!["--user"];
        full.extend_from_slice(args);
        run_checked(MANAGER, "systemctl", &full, env, ignore_failure)
    }
}

impl ServiceManager for SystemdUserService {
    fn name(&self) -> &'static str {
        MANAGER
    }

    fn definition_path(&self) -> PathBuf {
        systemd_unit_path(&self.home)
    }

    fn is_loaded(&self, env: &ProcessEnv) -> Result<bool, DaemonError> {
        let output = run_command("systemctl", &["--user", "is-enabled", SYSTEMD_UNIT], env)?;
        Ok(output.status.success())
    }

    fn install(&self, env: &ProcessEnv, request: &InstallRequest) -> Result<(), DaemonError> {
        let unit = self.definition_path();
        write_private_file(&unit, &generate_unit(request))?;
        self.systemctl(&["daemon-reload"], env, false)?;
        self.systemctl(&["enable", SYSTEMD_UNIT], env, false)?;
        self.systemctl(&["restart", SYSTEMD_UNIT], env, false)?;
        tracing::info!(unit = %unit.display(), "systemd user unit installed");
        Ok(())
    }

    fn uninstall(&self, env: &ProcessEnv) -> Result<(), DaemonError> {
        self.systemctl(&["disable", "--now", SYSTEMD_UNIT], env, true)?;
        let unit = self.definition_path();
        if unit.exists() {
            fs::remove_file(&unit).map_err(|e| io_err(&unit, e))?;
        }
        self.systemctl(&["daemon-reload"], env, true)?;
        tracing::info!(unit = %unit.display(), "systemd user unit removed");
        Ok(())
    }

    fn restart(&self, env: &ProcessEnv) -> Result<(), DaemonError> {
        self.systemctl(&["restart", SYSTEMD_UNIT], env, false)
    }

    fn session_scoped(&self) -> bool {
        true
    }
}
