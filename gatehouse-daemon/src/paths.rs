use std::path::{Path, PathBuf};

pub use gatehouse_core::paths::logs_dir;

pub const GATEWAY_LABEL: &str = "dev.gatehouse.gateway";
pub const SYSTEMD_UNIT: &str = "gatehouse-gateway.service";

pub const GATEWAY_STDOUT_LOG: &str = "gateway.log";
pub const GATEWAY_STDERR_LOG: &str = "gateway-err.log";

pub fn stdout_log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(GATEWAY_STDOUT_LOG)
}

pub fn stderr_log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(GATEWAY_STDERR_LOG)
}

pub fn launch_agents_dir(home: &Path) -> PathBuf {
    home.join("Library").join("LaunchAgents")
}

pub fn launchd_plist_path(home: &Path) -> PathBuf {
    launch_agents_dir(home).join(format!("{GATEWAY_LABEL}.plist"))
}

pub fn systemd_user_dir(home: &Path) -> PathBuf {
    home.join(".config").join("systemd").join("user")
}

pub fn systemd_unit_path(home: &Path) -> PathBuf {
    systemd_user_dir(home).join(SYSTEMD_UNIT)
}
