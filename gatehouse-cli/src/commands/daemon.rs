//! `gatehouse daemon`: non-interactive gateway service management.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;

use gatehouse_core::{store, AuthMode, ProcessEnv, RuntimeConfig};
use gatehouse_daemon::{
    plan, resolve_service, DaemonLifecycle, DaemonParams, ExistingServiceAction, GatewayProbe,
    GatewayRuntime, HealthStatus, Loginctl, ServiceManager,
};

use crate::prompter::DialoguerPrompter;

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Register and start the gateway service.
    Install(InstallArgs),
    /// Stop and remove the gateway service.
    Uninstall,
    /// Restart the registered gateway service.
    Restart,
    /// Show registration and health.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Gateway port (defaults to the configured port).
    #[arg(long)]
    pub port: Option<u16>,

    /// Runtime that executes the gateway.
    #[arg(long, default_value = "node")]
    pub runtime: GatewayRuntime,

    /// Reinstall when the service is already registered.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson {
    manager: &'static str,
    definition: String,
    loaded: bool,
    port: u16,
    health: String,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = super::home()?;
    let env = ProcessEnv::capture();
    let service = resolve_service(&home, &env).context("gateway service is not supported here")?;
    let snapshot = store::read_snapshot_at(&home).context("failed to read config")?;
    let config = snapshot.config;

    match command {
        DaemonCommand::Install(args) => install(service.as_ref(), &env, &config, args)?,
        DaemonCommand::Uninstall => {
            service
                .uninstall(&env)
                .context("failed to uninstall gateway service")?;
            println!("uninstalled gateway service ({})", service.name());
        }
        DaemonCommand::Restart => {
            service
                .restart(&env)
                .context("failed to restart gateway service")?;
            println!("restarted gateway service ({})", service.name());
        }
        DaemonCommand::Status(args) => status(service.as_ref(), &env, &config, args)?,
    }
    Ok(())
}

fn install(
    service: &dyn ServiceManager,
    env: &ProcessEnv,
    config: &RuntimeConfig,
    args: InstallArgs,
) -> Result<()> {
    let loaded = service
        .is_loaded(env)
        .context("failed to query gateway service")?;
    if loaded && !args.force {
        println!(
            "{} gateway service already installed; pass --force to reinstall",
            "note:".yellow()
        );
        return Ok(());
    }

    let token = match config.gateway.auth.mode {
        AuthMode::Token => config.gateway.auth.token.clone(),
        _ => None,
    };
    let params = DaemonParams {
        port: args.port.unwrap_or(config.gateway.port),
        token,
        runtime: Some(args.runtime),
        exe: std::env::current_exe().context("could not locate the gatehouse executable")?,
    };
    let linger = Loginctl;
    let lifecycle = DaemonLifecycle {
        service,
        linger: &linger,
        env,
    };
    let mut prompter = DialoguerPrompter::new();
    lifecycle
        .execute(
            &plan(loaded, ExistingServiceAction::Reinstall),
            &params,
            &mut prompter,
        )
        .context("failed to install gateway service")?;
    println!(
        "installed gateway service: {}",
        service.definition_path().display()
    );
    Ok(())
}

fn status(
    service: &dyn ServiceManager,
    env: &ProcessEnv,
    config: &RuntimeConfig,
    args: StatusArgs,
) -> Result<()> {
    let loaded = service
        .is_loaded(env)
        .context("failed to query gateway service")?;
    let health = super::runtime()?.block_on(GatewayProbe::for_config(config, env).probe());

    if args.json {
        let payload = StatusJson {
            manager: service.name(),
            definition: service.definition_path().display().to_string(),
            loaded,
            port: config.gateway.port,
            health: health_label(&health),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to render status JSON")?
        );
        return Ok(());
    }

    let registered = if loaded {
        "loaded".green()
    } else {
        "not loaded".red()
    };
    println!("service:  {} ({})", registered, service.name());
    println!("unit:     {}", service.definition_path().display());
    let health_text = health_label(&health);
    let health_text = if health.is_healthy() {
        health_text.green()
    } else {
        health_text.yellow()
    };
    println!("gateway:  127.0.0.1:{} {}", config.gateway.port, health_text);
    if !health.is_healthy() && loaded {
        return Err(anyhow!(
            "gateway service is loaded but not healthy; see {}",
            gatehouse_core::docs::TROUBLESHOOTING
        ));
    }
    Ok(())
}

fn health_label(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Unauthorized => "unauthorized".to_string(),
        HealthStatus::Degraded(detail) => format!("degraded: {detail}"),
        HealthStatus::Unreachable(detail) => format!("unreachable: {detail}"),
    }
}
