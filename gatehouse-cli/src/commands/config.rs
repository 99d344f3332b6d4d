//! `gatehouse config`: inspect the config file without leaking secrets.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gatehouse_core::{store, ConfigIssue, ConfigSnapshot, RuntimeConfig};
use gatehouse_wizard::summary::summarize;

const REDACTED: &str = "[REDACTED]";

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current config with secrets redacted.
    Show {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ShowJson<'a> {
    path: String,
    exists: bool,
    valid: bool,
    issues: Vec<IssueJson<'a>>,
    config: RuntimeConfig,
}

#[derive(Serialize)]
struct IssueJson<'a> {
    path: &'a str,
    message: &'a str,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "profile")]
    profile: String,
    #[tabled(rename = "provider")]
    provider: String,
    #[tabled(rename = "mode")]
    mode: String,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = super::home()?;
    let snapshot = store::read_snapshot_at(&home).context("failed to read config")?;
    match command {
        ConfigCommand::Show { json: true } => print_json(&snapshot),
        ConfigCommand::Show { json: false } => {
            print_text(&snapshot);
            Ok(())
        }
    }
}

/// Copy of `config` with every stored secret replaced by a marker.
fn redacted(config: &RuntimeConfig) -> RuntimeConfig {
    let mut out = config.clone();
    let auth = &mut out.gateway.auth;
    if auth.token.is_some() {
        auth.token = Some(REDACTED.to_string());
    }
    if auth.password.is_some() {
        auth.password = Some(REDACTED.to_string());
    }
    if let Some(remote) = out.gateway.remote.as_mut() {
        if remote.token.is_some() {
            remote.token = Some(REDACTED.to_string());
        }
    }
    out
}

fn print_json(snapshot: &ConfigSnapshot) -> Result<()> {
    let payload = ShowJson {
        path: snapshot.path.display().to_string(),
        exists: snapshot.exists,
        valid: snapshot.valid,
        issues: snapshot
            .issues
            .iter()
            .map(|ConfigIssue { path, message }| IssueJson { path, message })
            .collect(),
        config: redacted(&snapshot.config),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to render config JSON")?
    );
    Ok(())
}

fn print_text(snapshot: &ConfigSnapshot) {
    let state = match (snapshot.exists, snapshot.valid) {
        (false, _) => "not found (defaults shown)".yellow(),
        (true, true) => "valid".green(),
        (true, false) => "invalid".red(),
    };
    println!("{} {}", snapshot.path.display().to_string().bold(), state);

    let config = redacted(&snapshot.config);
    for line in summarize(&config).lines() {
        println!("  {line}");
    }
    if config.gateway.auth.token.is_some() {
        println!("  gateway.auth.token: {REDACTED}");
    }
    if config.gateway.auth.password.is_some() {
        println!("  gateway.auth.password: {REDACTED}");
    }

    if !snapshot.issues.is_empty() {
        println!();
        println!("{}", "Issues".bold());
        for issue in &snapshot.issues {
            println!("  - {}: {}", issue.path, issue.message);
        }
    }

    if !config.auth_profiles.is_empty() {
        println!();
        let rows: Vec<ProfileRow> = config
            .auth_profiles
            .iter()
            .map(|p| ProfileRow {
                profile: p.profile_id.to_string(),
                provider: p.provider.clone(),
                mode: p.mode.to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::types::RemoteGateway;

    #[test]
    fn redaction_covers_every_secret_field() {
        let mut config = RuntimeConfig::default();
        config.gateway.auth.token = Some("tok".into());
        config.gateway.auth.password = Some("pw".into());
        config.gateway.remote = Some(RemoteGateway {
            url: "wss://gw.example:18789".into(),
            token: Some("remote-secret".into()),
        });

        let out = redacted(&config);
        let json = serde_json::to_string(&out).expect("json");
        assert!(!json.contains("\"tok\""));
        assert!(!json.contains("\"pw\""));
        assert!(!json.contains("remote-secret"));
        assert_eq!(out.gateway.auth.token.as_deref(), Some(REDACTED));
    }

    #[test]
    fn missing_secrets_stay_missing() {
        let out = redacted(&RuntimeConfig::default());
        assert!(out.gateway.auth.token.is_none());
        assert!(out.gateway.remote.is_none());
    }
}
