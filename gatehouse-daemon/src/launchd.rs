use std::fs;
use std::path::{Path, PathBuf};

use gatehouse_core::ProcessEnv;

use crate::error::{io_err, DaemonError};
use crate::paths::{launchd_plist_path, logs_dir, GATEWAY_LABEL, GATEWAY_STDERR_LOG, GATEWAY_STDOUT_LOG};
use crate::service::{run_checked, run_command, write_private_file, InstallRequest, ServiceManager};

const MANAGER: &str = "launchd";

/// Generate the LaunchAgent plist for the gateway.
pub fn generate_plist(request: &InstallRequest, log_dir: &Path) -> String {
    let stdout = log_dir.join(GATEWAY_STDOUT_LOG).display().to_string();
    let stderr = log_dir.join(GATEWAY_STDERR_LOG).display().to_string();

    let args: String = request
        .program_arguments
        .iter()
        .map(|arg| format!("    <string>{}</string>\n", xml_escape(arg)))
        .collect();

    let environment = if request.environment.is_empty() {
        String::new()
    } else {
        let entries: String = request
            .environment
            .iter()
            .map(|(key, value)| {
                format!(
                    "    <key>{}</key>\n    <string>{}</string>\n",
                    xml_escape(key),
                    xml_escape(value)
                )
            })
            .collect();
        format!("  <key>EnvironmentVariables</key>\n  <dict>\n{entries}  </dict>\n")
    };

    let working_directory = request
        .working_directory
        .as_ref()
        .map(|dir| {
            format!(
                "  <key>WorkingDirectory</key>\n  <string>{}</string>\n",
                xml_escape(&dir.display().to_string())
            )
        })
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
{args}  </array>
{environment}{working_directory}  <key>RunAtLoad</key>
  <true/>
  <key>KeepAlive</key>
  <true/>
  <key>StandardOutPath</key>
  <string>{stdout}</string>
  <key>StandardErrorPath</key>
  <string>{stderr}</string>
</dict>
</plist>
"#,
        label = GATEWAY_LABEL,
        stdout = xml_escape(&stdout),
        stderr = xml_escape(&stderr),
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Per-user LaunchAgent in the `gui/<uid>` domain.
#[derive(Debug, Clone)]
pub struct LaunchdService {
    home: PathBuf,
}

impl LaunchdService {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    fn service_target(&self, env: &ProcessEnv) -> Result<(String, String), DaemonError> {
        let domain = launchctl_domain(env)?;
        let service = format!("{domain}/{GATEWAY_LABEL}");
        Ok((domain, service))
    }
}

impl ServiceManager for LaunchdService {
    fn name(&self) -> &'static str {
        MANAGER
    }

    fn definition_path(&self) -> PathBuf {
        launchd_plist_path(&self.home)
    }

    fn is_loaded(&self, env: &ProcessEnv) -> Result<bool, DaemonError> {
        let (_, service) = self.service_target(env)?;
        let output = run_command("launchctl", &["print", &service], env)?;
        Ok(output.status.success())
    }

    fn install(&self, env: &ProcessEnv, request: &InstallRequest) -> Result<(), DaemonError> {
        let logs = logs_dir(&self.home);
        if !logs.exists() {
            fs::create_dir_all(&logs).map_err(|e| io_err(&logs, e))?;
        }

        let plist = self.definition_path();
        write_private_file(&plist, &generate_plist(request, &logs))?;

        let (domain, service) = self.service_target(env)?;
        let plist_arg = plist.display().to_string();
        run_checked(MANAGER, "launchctl", &["bootout", &service], env, true)?;
        run_checked(MANAGER, "launchctl", &["bootstrap", &domain, &plist_arg], env, false)?;
        run_checked(MANAGER, "launchctl", &["kickstart", "-k", &service], env, false)?;
        tracing::info!(plist = %plist.display(), "launch agent installed");
        Ok(())
    }

    fn uninstall(&self, env: &ProcessEnv) -> Result<(), DaemonError> {
        let plist = self.definition_path();
        let (_, service) = self.service_target(env)?;
        run_checked(MANAGER, "launchctl", &["bootout", &service], env, true)?;
        if plist.exists() {
            fs::remove_file(&plist).map_err(|e| io_err(&plist, e))?;
        }
        tracing::info!(plist = %plist.display(), "launch agent removed");
        Ok(())
    }

    fn restart(&self, env: &ProcessEnv) -> Result<(), DaemonError> {
        let (_, service) = self.service_target(env)?;
        run_checked(MANAGER, "launchctl", &["kickstart", "-k", &service], env, false)
    }
}

fn launchctl_domain(env: &ProcessEnv) -> Result<String, DaemonError> {
    let output = run_command("id", &["-u"], env)?;
    if !output.status.success() {
        return Err(DaemonError::ServiceManager {
            manager: MANAGER,
            message: format!("failed to resolve current uid (status {})", output.status),
        });
    }

    let uid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if uid.is_empty() {
        return Err(DaemonError::ServiceManager {
            manager: MANAGER,
            message: "current uid from `id -u` was empty".to_string(),
        });
    }
    Ok(format!("gui/{uid}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::Value;
    use std::collections::BTreeMap;

    fn request() -> InstallRequest {
        InstallRequest {
            program_arguments: vec![
                "/usr/local/bin/node".into(),
                "/opt/gatehouse/lib/gatehouse/dist/index.js".into(),
                "gateway".into(),
                "--port".into(),
                "18789".into(),
            ],
            environment: BTreeMap::from([
                ("GATEHOUSE_GATEWAY_TOKEN".to_string(), "t<&>k".to_string()),
                ("PATH".to_string(), "/usr/bin:/bin".to_string()),
            ]),
            working_directory: Some(PathBuf::from("/Users/tester/src/gatehouse")),
        }
    }

    #[test]
    fn plist_contains_required_launchd_fields() {
        let plist = generate_plist(&request(), Path::new("/Users/tester/.gatehouse/logs"));

        let value = Value::from_reader_xml(plist.as_bytes()).expect("parse plist");
        let dict = value.as_dictionary().expect("plist root dict");

        assert_eq!(
            dict.get("Label").and_then(Value::as_string),
            Some("dev.gatehouse.gateway")
        );
        assert_eq!(dict.get("RunAtLoad").and_then(Value::as_boolean), Some(true));
        assert_eq!(dict.get("KeepAlive").and_then(Value::as_boolean), Some(true));
        assert_eq!(
            dict.get("WorkingDirectory").and_then(Value::as_string),
            Some("/Users/tester/src/gatehouse")
        );
        assert_eq!(
            dict.get("StandardOutPath").and_then(Value::as_string),
            Some("/Users/tester/.gatehouse/logs/gateway.log")
        );

        let args: Vec<&str> = dict
            .get("ProgramArguments")
            .and_then(Value::as_array)
            .expect("ProgramArguments array")
            .iter()
            .map(|v| v.as_string().expect("program arg as string"))
            .collect();
        assert_eq!(args[2..], ["gateway", "--port", "18789"]);

        let env = dict
            .get("EnvironmentVariables")
            .and_then(Value::as_dictionary)
            .expect("env dict");
        assert_eq!(
            env.get("GATEHOUSE_GATEWAY_TOKEN").and_then(Value::as_string),
            Some("t<&>k")
        );
    }

    #[test]
    fn empty_environment_omits_dict() {
        let mut req = request();
        req.environment.clear();
        req.working_directory = None;
        let plist = generate_plist(&req, Path::new("/tmp/logs"));
        assert!(!plist.contains("EnvironmentVariables"));
        assert!(!plist.contains("WorkingDirectory"));
        Value::from_reader_xml(plist.as_bytes()).expect("still valid plist");
    }
}
