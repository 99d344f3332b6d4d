//! Launch command and private environment for the gateway service.
//!
//! Development builds (the binary sits under `target/debug` or
//! `target/release`) run the gateway from the source checkout; installed
//! builds run the bundled `lib/gatehouse/dist/index.js` next to `bin/`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use gatehouse_core::{Choice, ProcessEnv};

use crate::error::DaemonError;
use crate::paths::GATEWAY_LABEL;
use crate::service::InstallRequest;

pub const ENV_GATEWAY_TOKEN: &str = "GATEHOUSE_GATEWAY_TOKEN";
pub const ENV_GATEWAY_PORT: &str = "GATEHOUSE_GATEWAY_PORT";
pub const ENV_LAUNCHD_LABEL: &str = "GATEHOUSE_LAUNCHD_LABEL";

/// JavaScript runtime that hosts the gateway process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayRuntime {
    #[default]
    Node,
    Bun,
}

impl GatewayRuntime {
    pub const ALL: [GatewayRuntime; 2] = [GatewayRuntime::Node, GatewayRuntime::Bun];

    pub fn as_str(self) -> &'static str {
        match self {
            GatewayRuntime::Node => "node",
            GatewayRuntime::Bun => "bun",
        }
    }

    pub fn choices() -> Vec<Choice> {
        vec![
            Choice::new("node", "Node").hint("recommended"),
            Choice::new("bun", "Bun").hint("experimental"),
        ]
    }
}

impl fmt::Display for GatewayRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayRuntime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(GatewayRuntime::Node),
            "bun" => Ok(GatewayRuntime::Bun),
            other => Err(format!("unknown gateway runtime '{other}'")),
        }
    }
}

/// Inputs to [`build_install_request`].
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub port: u16,
    pub runtime: GatewayRuntime,
    /// Path of the running `gatehouse` executable.
    pub exe: PathBuf,
    pub token: Option<String>,
}

/// Source checkout root when `exe` is a cargo build artifact.
pub fn dev_checkout_root(exe: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = exe.components().collect();
    components.windows(2).enumerate().rev().find_map(|(idx, pair)| {
        let is_target = pair[0].as_os_str() == "target";
        let is_profile = matches!(pair[1].as_os_str().to_str(), Some("debug" | "release"));
        (is_target && is_profile).then(|| components[..idx].iter().collect::<PathBuf>())
    })
}

pub fn build_install_request(
    spec: &LaunchSpec,
    env: &ProcessEnv,
) -> Result<InstallRequest, DaemonError> {
    let runtime_bin = env
        .which(spec.runtime.as_str())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| spec.runtime.as_str().to_string());

    let (mut program_arguments, working_directory) = match dev_checkout_root(&spec.exe) {
        Some(root) => {
            let entry = root.join("gateway").join("src").join("index.ts");
            let args = match spec.runtime {
                GatewayRuntime::Node => vec![
                    runtime_bin,
                    "--import".to_string(),
                    "tsx".to_string(),
                    entry.display().to_string(),
                ],
                GatewayRuntime::Bun => vec![runtime_bin, entry.display().to_string()],
            };
            (args, Some(root))
        }
        None => {
            let bin_dir = spec.exe.parent().ok_or_else(|| {
                DaemonError::LaunchCommand(format!("{} has no parent directory", spec.exe.display()))
            })?;
            let prefix = bin_dir.parent().unwrap_or(bin_dir);
            let entry = prefix
                .join("lib")
                .join("gatehouse")
                .join("dist")
                .join("index.js");
            (vec![runtime_bin, entry.display().to_string()], None)
        }
    };
    program_arguments.extend([
        "gateway".to_string(),
        "--port".to_string(),
        spec.port.to_string(),
    ]);

    Ok(InstallRequest {
        program_arguments,
        environment: service_environment(env, spec.port, spec.token.as_deref()),
        working_directory,
    })
}

/// Environment handed only to the service, never exported to this process.
pub fn service_environment(
    env: &ProcessEnv,
    port: u16,
    token: Option<&str>,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for key in ["PATH", "HOME"] {
        if let Some(value) = env.get(key) {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars.insert(ENV_GATEWAY_PORT.to_string(), port.to_string());
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        vars.insert(ENV_GATEWAY_TOKEN.to_string(), token.to_string());
    }
    if env.is_macos() {
        vars.insert(ENV_LAUNCHD_LABEL.to_string(), GATEWAY_LABEL.to_string());
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(os: &str) -> ProcessEnv {
        ProcessEnv::from_pairs(os, [("PATH", "/nonexistent-bin"), ("HOME", "/home/t")])
    }

    #[test]
    fn dev_build_is_detected_from_target_dir() {
        assert_eq!(
            dev_checkout_root(Path::new("/src/gatehouse/target/debug/gatehouse")),
            Some(PathBuf::from("/src/gatehouse"))
        );
        assert_eq!(
            dev_checkout_root(Path::new("/src/gatehouse/target/release/gatehouse")),
            Some(PathBuf::from("/src/gatehouse"))
        );
        assert_eq!(dev_checkout_root(Path::new("/usr/local/bin/gatehouse")), None);
        assert_eq!(dev_checkout_root(Path::new("/srv/target/gatehouse")), None);
    }

    #[test]
    fn dev_node_uses_tsx_loader_and_checkout_root() {
        let spec = LaunchSpec {
            port: 19001,
            runtime: GatewayRuntime::Node,
            exe: PathBuf::from("/src/gatehouse/target/debug/gatehouse"),
            token: None,
        };
        let req = build_install_request(&spec, &env("linux")).expect("request");
        assert_eq!(
            req.program_arguments,
            vec![
                "node",
                "--import",
                "tsx",
                "/src/gatehouse/gateway/src/index.ts",
                "gateway",
                "--port",
                "19001"
            ]
        );
        assert_eq!(req.working_directory, Some(PathBuf::from("/src/gatehouse")));
    }

    #[test]
    fn installed_bun_uses_bundled_entry() {
        let spec = LaunchSpec {
            port: 18789,
            runtime: GatewayRuntime::Bun,
            exe: PathBuf::from("/opt/gatehouse/bin/gatehouse"),
            token: Some("tok".into()),
        };
        let req = build_install_request(&spec, &env("linux")).expect("request");
        assert_eq!(
            req.program_arguments,
            vec![
                "bun",
                "/opt/gatehouse/lib/gatehouse/dist/index.js",
                "gateway",
                "--port",
                "18789"
            ]
        );
        assert_eq!(req.working_directory, None);
        assert_eq!(req.environment.get(ENV_GATEWAY_TOKEN).map(String::as_str), Some("tok"));
        assert!(!req.environment.contains_key(ENV_LAUNCHD_LABEL));
    }

    #[test]
    fn macos_environment_carries_label_and_no_blank_token() {
        let vars = service_environment(&env("macos"), 18789, Some("  "));
        assert_eq!(vars.get(ENV_LAUNCHD_LABEL).map(String::as_str), Some(GATEWAY_LABEL));
        assert!(!vars.contains_key(ENV_GATEWAY_TOKEN));
        assert_eq!(vars.get("PATH").map(String::as_str), Some("/nonexistent-bin"));
    }

    #[test]
    fn runtime_parses() {
        assert_eq!("Bun".parse::<GatewayRuntime>(), Ok(GatewayRuntime::Bun));
        assert!("deno".parse::<GatewayRuntime>().is_err());
    }
}
