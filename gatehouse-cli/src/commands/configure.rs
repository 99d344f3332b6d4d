//! `gatehouse configure`: the interactive setup wizard.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use gatehouse_auth::{AuthFlowRunner, HttpTokenExchanger, SystemOpener, UrlOpener};
use gatehouse_core::{KeyringStore, ProcessEnv, SecretStore};
use gatehouse_daemon::{resolve_service, Loginctl};
use gatehouse_wizard::{ProbeHealthCheck, Section, Wizard, WizardError, WizardOptions};

use crate::prompter::DialoguerPrompter;

/// Arguments for `gatehouse configure`.
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Run only these sections (comma separated), skipping the picker.
    #[arg(long = "section", value_delimiter = ',')]
    pub sections: Vec<Section>,
}

impl ConfigureArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let env = ProcessEnv::capture();
        let exe = std::env::current_exe().context("could not locate the gatehouse executable")?;

        let secrets: Arc<dyn SecretStore> = Arc::new(KeyringStore);
        let opener: Arc<dyn UrlOpener> = Arc::new(SystemOpener);
        let auth = AuthFlowRunner::new(
            secrets,
            Arc::new(HttpTokenExchanger::default()),
            opener.clone(),
            env.clone(),
        );
        let service = match resolve_service(&home, &env) {
            Ok(service) => Some(service),
            Err(err) => {
                tracing::debug!(error = %err, "no service manager for this platform");
                None
            }
        };

        let wizard = Wizard {
            home,
            env: env.clone(),
            exe,
            command: "configure".to_string(),
            auth,
            service,
            linger: Box::new(Loginctl),
            opener,
            health: Box::new(ProbeHealthCheck { env }),
            health_delay: Duration::from_secs(1),
            clock: Utc::now,
        };
        let options = WizardOptions {
            sections: (!self.sections.is_empty()).then_some(self.sections),
        };

        println!("{}", "gatehouse configure".bold());
        let mut prompter = DialoguerPrompter::new();
        let runtime = super::runtime()?;
        match runtime.block_on(wizard.run(&options, &mut prompter)) {
            Ok(_) => Ok(()),
            Err(WizardError::Cancelled) => {
                println!("{}", "Configure cancelled.".yellow());
                Ok(())
            }
            Err(err) => Err(err).context("configure failed"),
        }
    }
}
