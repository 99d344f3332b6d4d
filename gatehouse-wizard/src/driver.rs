//! The configure wizard: a fixed driver over independent sections.
//!
//! ```text
//! snapshot ─▶ mode? ─┬─ remote ─▶ remote URL/token ─▶ write ─▶ done
//!                    └─ local ──▶ sections ─▶ workspace ─▶ model ─▶ gateway
//!                                             ─▶ write once ─▶ daemon ─▶ health ─▶ links
//! ```
//!
//! A cancelled or failed section is reported and skipped; what earlier
//! sections committed stays. Only a broken invariant or a failed config
//! write stops the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gatehouse_auth::{
    prompt_auth_choice, prompt_default_model, AuthError, AuthFlowRunner, ModelSelection, UrlOpener,
};
use gatehouse_core::prompt::{parse_port, validate_port};
use gatehouse_core::types::GatewayMode;
use gatehouse_core::{
    docs, store, AuthMode, Choice, ProcessEnv, Prompter, RuntimeConfig, TextPrompt,
};
use gatehouse_daemon::{
    DaemonError, DaemonLifecycle, DaemonParams, DaemonReport, HealthStatus, LingerControl,
    ServiceManager,
};

use crate::error::WizardError;
use crate::health::{self, HealthCheck};
use crate::links::{control_ui_links, ssh_tunnel_hint};
use crate::section::{self, Section};
use crate::summary::{needs_token, summarize};
use crate::{gateway, remote, workspace};

/// Caller-provided options (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct WizardOptions {
    /// Run these sections without asking.
    pub sections: Option<Vec<Section>>,
}

#[derive(Debug, Clone)]
pub struct WizardOutcome {
    pub mode: GatewayMode,
    pub sections: Vec<Section>,
    pub config: RuntimeConfig,
    /// Path of the written config, if anything was written.
    pub written: Option<PathBuf>,
    pub daemon: Option<DaemonReport>,
    pub health: Option<HealthStatus>,
}

pub struct Wizard {
    pub home: PathBuf,
    pub env: ProcessEnv,
    /// Currently running executable, for the daemon launch command.
    pub exe: PathBuf,
    /// Recorded in the wizard metadata, e.g. `configure`.
    pub command: String,
    pub auth: AuthFlowRunner,
    /// `None` on platforms without a supported service manager.
    pub service: Option<Box<dyn ServiceManager>>,
    pub linger: Box<dyn LingerControl>,
    pub opener: Arc<dyn UrlOpener>,
    pub health: Box<dyn HealthCheck>,
    /// Pause before probing so a freshly (re)started gateway can bind.
    pub health_delay: Duration,
    pub clock: fn() -> DateTime<Utc>,
}

impl Wizard {
    pub async fn run(
        &self,
        options: &WizardOptions,
        prompter: &mut dyn Prompter,
    ) -> Result<WizardOutcome, WizardError> {
        let base = self.load_base(prompter)?;
        let mode = self.ask_mode(&base, prompter).await?;

        if mode == GatewayMode::Remote {
            let mut next = remote::collect(&base, prompter)?;
            let path = self.write(&mut next, mode)?;
            prompter.log(&format!("Updated {}", path.display()));
            prompter.log("Remote gateway configured.");
            return Ok(WizardOutcome {
                mode,
                sections: Vec::new(),
                config: next,
                written: Some(path),
                daemon: None,
                health: None,
            });
        }

        let sections = match &options.sections {
            Some(given) => section::normalize(given.iter().copied()),
            None => {
                let picked =
                    prompter.multiselect("Select sections to configure", &Section::choices())?;
                section::normalize(
                    picked
                        .iter()
                        .map(|v| v.parse::<Section>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(WizardError::Prompt)?,
                )
            }
        };
        if sections.is_empty() {
            prompter.log("No changes selected.");
            return Ok(WizardOutcome {
                mode,
                sections,
                config: base,
                written: None,
                daemon: None,
                health: None,
            });
        }
        tracing::info!(sections = ?sections, "configure sections selected");

        let mut next = base;
        let mut selection = ModelSelection::from_config(&next);
        let mut gateway_port = next.gateway.port;
        let mut gateway_token: Option<String> = None;

        if sections.contains(&Section::Workspace) {
            let result = workspace::collect(&next, &self.home, prompter);
            if let Some(updated) = section_result(Section::Workspace, result, prompter)? {
                next = updated;
            }
        }

        if sections.contains(&Section::Model) {
            next = self.model_section(next, &mut selection, prompter).await;
        }

        if sections.contains(&Section::Gateway) {
            let result = gateway::collect(&next, prompter);
            if let Some(outcome) = section_result(Section::Gateway, result, prompter)? {
                next = outcome.config;
                gateway_port = outcome.port;
                gateway_token = outcome.token;
            }
        }

        let written = if sections.iter().any(|s| s.writes_config()) {
            let path = self.write(&mut next, mode)?;
            prompter.log(&format!("Updated {}", path.display()));
            Some(path)
        } else {
            None
        };

        let mut daemon = None;
        if sections.contains(&Section::Daemon) {
            let port = if sections.contains(&Section::Gateway) {
                Some(gateway_port)
            } else {
                let result = ask_daemon_port(gateway_port, prompter);
                section_result(Section::Daemon, result, prompter)?
            };
            if let Some(port) = port {
                gateway_port = port;
                let token = gateway_token.clone().or_else(|| {
                    (next.gateway.auth.mode == AuthMode::Token)
                        .then(|| next.gateway.auth.token.clone())
                        .flatten()
                });
                daemon = self.daemon_section(port, token, prompter);
            }
        }

        let mut health = None;
        if sections.contains(&Section::Health) {
            if !self.health_delay.is_zero() {
                tokio::time::sleep(self.health_delay).await;
            }
            let status = self.health.check(&next).await;
            health::report(&status, prompter);
            health = Some(status);
        }

        self.show_control_ui(&next, gateway_port, prompter);
        prompter.log("Configure complete.");
        Ok(WizardOutcome {
            mode,
            sections,
            config: next,
            written,
            daemon,
            health,
        })
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn load_base(&self, prompter: &mut dyn Prompter) -> Result<RuntimeConfig, WizardError> {
        let snapshot = store::read_snapshot_at(&self.home)?;
        if !snapshot.exists {
            return Ok(RuntimeConfig::default());
        }

        let title = if snapshot.valid {
            "Existing config detected"
        } else {
            "Invalid config"
        };
        prompter.note(title, &summarize(&snapshot.config));
        if snapshot.valid {
            return Ok(snapshot.config);
        }

        if !snapshot.issues.is_empty() {
            let mut lines: Vec<String> = snapshot
                .issues
                .iter()
                .map(|issue| format!("- {}: {}", issue.path, issue.message))
                .collect();
            lines.push(String::new());
            lines.push(format!("Docs: {}", docs::CONFIGURATION));
            prompter.note("Config issues", &lines.join("\n"));
        }
        let reset = prompter.confirm("Config invalid. Start fresh?", true)?;
        Ok(if reset {
            RuntimeConfig::default()
        } else {
            snapshot.config
        })
    }

    async fn ask_mode(
        &self,
        base: &RuntimeConfig,
        prompter: &mut dyn Prompter,
    ) -> Result<GatewayMode, WizardError> {
        let local_url = format!("ws://127.0.0.1:{}", base.gateway.port);
        let local_hint = if self.health.check(base).await.is_healthy() {
            format!("Gateway reachable ({local_url})")
        } else {
            format!("No gateway detected ({local_url})")
        };
        let remote_hint = match &base.gateway.remote {
            Some(remote) if !remote.url.trim().is_empty() => format!("Configured ({})", remote.url),
            _ => "No remote URL configured yet".to_string(),
        };

        let value = prompter.select(
            "Where will the Gateway run?",
            &[
                Choice::new("local", "Local (this machine)").hint(local_hint),
                Choice::new("remote", "Remote (info-only)").hint(remote_hint),
            ],
            Some(base.gateway.mode.as_str()),
        )?;
        value.parse().map_err(WizardError::Prompt)
    }

    /// Auth choice, then the explicit default-model prompt. Failures were
    /// already shown by the runner; the config passes through unchanged.
    async fn model_section(
        &self,
        config: RuntimeConfig,
        selection: &mut ModelSelection,
        prompter: &mut dyn Prompter,
    ) -> RuntimeConfig {
        let choice = match prompt_auth_choice(prompter) {
            Ok(choice) => choice,
            Err(AuthError::Cancelled) => {
                prompter.log("Model/auth cancelled.");
                return config;
            }
            Err(err) => {
                prompter.error(&err.to_string());
                return config;
            }
        };

        let mut next = match self.auth.run(choice, &config, selection, prompter).await {
            Ok(applied) => applied.config,
            Err(_) => config,
        };

        match prompt_default_model(&mut next, selection, prompter) {
            Ok(()) => {}
            Err(AuthError::Cancelled) => prompter.log("Default model unchanged."),
            Err(err) => prompter.error(&err.to_string()),
        }
        next
    }

    fn daemon_section(
        &self,
        port: u16,
        token: Option<String>,
        prompter: &mut dyn Prompter,
    ) -> Option<DaemonReport> {
        let Some(service) = self.service.as_deref() else {
            prompter.error(&format!(
                "Gateway daemon is not supported on {}",
                self.env.os()
            ));
            prompter.note("Gateway daemon", &format!("Docs: {}", docs::DAEMON));
            return None;
        };

        let lifecycle = DaemonLifecycle {
            service,
            linger: self.linger.as_ref(),
            env: &self.env,
        };
        let params = DaemonParams {
            port,
            token,
            runtime: None,
            exe: self.exe.clone(),
        };
        match lifecycle.run_interactive(&params, prompter) {
            Ok(report) => Some(report),
            Err(DaemonError::Cancelled) => {
                prompter.log("Gateway daemon cancelled.");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "gateway daemon setup failed");
                prompter.error(&format!("Gateway daemon setup failed: {err}"));
                prompter.note("Gateway daemon", &format!("Docs: {}", docs::DAEMON));
                None
            }
        }
    }

    fn show_control_ui(&self, config: &RuntimeConfig, port: u16, prompter: &mut dyn Prompter) {
        let links = control_ui_links(config.gateway.bind, port, self.env.get("HOSTNAME"));
        prompter.note(
            "Control UI",
            &format!(
                "Web UI: {}\nGateway WS: {}\nDocs: {}",
                links.http_url,
                links.ws_url,
                docs::CONTROL_UI
            ),
        );

        let hint = ssh_tunnel_hint(port, needs_token(config));
        if !self.env.can_open_browser() {
            prompter.note("Open Control UI", &hint);
            return;
        }
        match prompter.confirm("Open Control UI now?", false) {
            Ok(true) => {
                if let Err(err) = self.opener.open(&links.http_url) {
                    tracing::debug!(error = %err, "could not open control UI");
                    prompter.note("Open Control UI", &hint);
                }
            }
            Ok(false) | Err(_) => {}
        }
    }

    /// Stamp metadata and write the whole config.
    fn write(&self, config: &mut RuntimeConfig, mode: GatewayMode) -> Result<PathBuf, WizardError> {
        config.stamp_wizard(&self.command, mode, (self.clock)());
        Ok(store::write_at(&self.home, config)?)
    }
}

fn ask_daemon_port(current: u16, prompter: &mut dyn Prompter) -> Result<u16, WizardError> {
    let raw = prompter.text(
        TextPrompt::new("Gateway port for daemon install")
            .initial(current.to_string())
            .validate(validate_port),
    )?;
    parse_port(&raw).map_err(WizardError::Prompt)
}

/// Turn a section's cancel, prompt or I/O failure into "skip this section".
/// Invariant and config errors still stop the run.
fn section_result<T>(
    section: Section,
    result: Result<T, WizardError>,
    prompter: &mut dyn Prompter,
) -> Result<Option<T>, WizardError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(WizardError::Cancelled) => {
            prompter.log(&format!("{} cancelled.", section.label()));
            Ok(None)
        }
        Err(WizardError::Prompt(message)) => {
            prompter.error(&format!("{}: {message}", section.label()));
            Ok(None)
        }
        Err(WizardError::Io { path, source }) => {
            prompter.error(&format!("{}: {}: {source}", section.label(), path.display()));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
