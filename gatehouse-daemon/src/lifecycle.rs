//! Gateway service lifecycle: decide, then drive the service manager.
//!
//! ```text
//! NotLoaded ──install──────────────────────▶ Loaded ─▶ linger check
//! Loaded    ──restart──────────────────────▶ Loaded ─▶ linger check
//! Loaded    ──reinstall─▶ uninstall ─▶ install ─▶ Loaded ─▶ linger check
//! Loaded    ──skip─────────────────────────▶ (nothing)
//! ```
//!
//! [`plan`] is the pure decision; [`DaemonLifecycle`] executes it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use gatehouse_core::{Choice, ProcessEnv, Prompter};

use crate::error::DaemonError;
use crate::launch::{build_install_request, GatewayRuntime, LaunchSpec};
use crate::linger::{ensure_linger, LingerControl, LingerOutcome};
use crate::service::ServiceManager;

/// User choice when the service is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingServiceAction {
    Restart,
    Reinstall,
    Skip,
}

impl ExistingServiceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ExistingServiceAction::Restart => "restart",
            ExistingServiceAction::Reinstall => "reinstall",
            ExistingServiceAction::Skip => "skip",
        }
    }

    pub fn choices() -> Vec<Choice> {
        vec![
            Choice::new("restart", "Restart"),
            Choice::new("reinstall", "Reinstall"),
            Choice::new("skip", "Skip"),
        ]
    }
}

impl fmt::Display for ExistingServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExistingServiceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "restart" => Ok(ExistingServiceAction::Restart),
            "reinstall" => Ok(ExistingServiceAction::Reinstall),
            "skip" => Ok(ExistingServiceAction::Skip),
            other => Err(format!("unknown service action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Uninstall,
    Install,
    Restart,
    CheckLinger,
}

/// Steps for the observed registration state and the user's choice.
/// `action` only matters when `loaded` is true.
pub fn plan(loaded: bool, action: ExistingServiceAction) -> Vec<Step> {
    if !loaded {
        return vec![Step::Install, Step::CheckLinger];
    }
    match action {
        ExistingServiceAction::Restart => vec![Step::Restart, Step::CheckLinger],
        ExistingServiceAction::Reinstall => vec![Step::Uninstall, Step::Install, Step::CheckLinger],
        ExistingServiceAction::Skip => Vec::new(),
    }
}

/// Desired service state.
#[derive(Debug, Clone)]
pub struct DaemonParams {
    pub port: u16,
    pub token: Option<String>,
    /// Preselected runtime; prompted for when `None` and an install happens.
    pub runtime: Option<GatewayRuntime>,
    pub exe: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonReport {
    pub executed: Vec<Step>,
    pub runtime: Option<GatewayRuntime>,
    pub linger: Option<LingerOutcome>,
}

impl DaemonReport {
    pub fn skipped(&self) -> bool {
        self.executed.is_empty()
    }
}

pub struct DaemonLifecycle<'a> {
    pub service: &'a dyn ServiceManager,
    pub linger: &'a dyn LingerControl,
    pub env: &'a ProcessEnv,
}

impl DaemonLifecycle<'_> {
    /// Inspect, ask when already installed, then apply.
    pub fn run_interactive(
        &self,
        params: &DaemonParams,
        prompter: &mut dyn Prompter,
    ) -> Result<DaemonReport, DaemonError> {
        let loaded = self.service.is_loaded(self.env)?;
        let action = if loaded {
            let value = prompter.select(
                "Gateway service already installed",
                &ExistingServiceAction::choices(),
                Some("restart"),
            )?;
            value.parse().map_err(DaemonError::Prompt)?
        } else {
            ExistingServiceAction::Reinstall
        };
        tracing::debug!(loaded, %action, "daemon lifecycle decision");
        self.execute(&plan(loaded, action), params, prompter)
    }

    pub fn execute(
        &self,
        steps: &[Step],
        params: &DaemonParams,
        prompter: &mut dyn Prompter,
    ) -> Result<DaemonReport, DaemonError> {
        let mut report = DaemonReport {
            executed: Vec::with_capacity(steps.len()),
            runtime: None,
            linger: None,
        };

        for step in steps {
            match step {
                Step::Uninstall => {
                    self.service.uninstall(self.env)?;
                    prompter.log("Removed existing gateway service.");
                }
                Step::Install => {
                    let runtime = match params.runtime {
                        Some(runtime) => runtime,
                        None => prompt_runtime(prompter)?,
                    };
                    let request = build_install_request(
                        &LaunchSpec {
                            port: params.port,
                            runtime,
                            exe: params.exe.clone(),
                            token: params.token.clone(),
                        },
                        self.env,
                    )?;
                    self.service.install(self.env, &request)?;
                    prompter.log(&format!(
                        "Installed gateway service ({}): {}",
                        self.service.name(),
                        self.service.definition_path().display()
                    ));
                    report.runtime = Some(runtime);
                }
                Step::Restart => {
                    self.service.restart(self.env)?;
                    prompter.log("Gateway service restarted.");
                }
                Step::CheckLinger => {
                    if self.service.session_scoped() {
                        report.linger = Some(ensure_linger(self.linger, self.env, prompter)?);
                    }
                }
            }
            report.executed.push(*step);
        }
        Ok(report)
    }
}

fn prompt_runtime(prompter: &mut dyn Prompter) -> Result<GatewayRuntime, DaemonError> {
    let value = prompter.select(
        "Gateway daemon runtime",
        &GatewayRuntime::choices(),
        Some(GatewayRuntime::default().as_str()),
    )?;
    value.parse().map_err(DaemonError::Prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, ExistingServiceAction::Skip, vec![Step::Install, Step::CheckLinger])]
    #[case(true, ExistingServiceAction::Restart, vec![Step::Restart, Step::CheckLinger])]
    #[case(true, ExistingServiceAction::Reinstall, vec![Step::Uninstall, Step::Install, Step::CheckLinger])]
    #[case(true, ExistingServiceAction::Skip, vec![])]
    fn plan_table(
        #[case] loaded: bool,
        #[case] action: ExistingServiceAction,
        #[case] expected: Vec<Step>,
    ) {
        assert_eq!(plan(loaded, action), expected);
    }

    #[test]
    fn reinstall_never_restarts() {
        let steps = plan(true, ExistingServiceAction::Reinstall);
        assert!(!steps.contains(&Step::Restart));
    }
}
