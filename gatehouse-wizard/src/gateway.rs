//! Gateway section: port, bind, auth and tunnel exposure.
//!
//! [`collect`] asks the questions; [`reconcile_answers`] and [`apply`] are
//! pure and hold the decision logic.

use gatehouse_core::prompt::{parse_port, validate_port, validate_required};
use gatehouse_core::reconcile::check_invariants;
use gatehouse_core::types::GatewayMode;
use gatehouse_core::{
    docs, reconcile, token, AuthMode, BindMode, Choice, ExposureMode, GatewayProposal, Prompter,
    Reconciled, RuntimeConfig, TextPrompt,
};

use crate::error::WizardError;

/// Raw answers, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAnswers {
    pub port: u16,
    pub bind: BindMode,
    pub auth_mode: AuthMode,
    pub exposure_mode: ExposureMode,
    pub reset_on_exit: bool,
}

/// The secret that goes with the reconciled auth mode.
#[derive(Clone, PartialEq, Eq)]
pub enum GatewaySecret {
    None,
    Token(String),
    Password(String),
}

impl std::fmt::Debug for GatewaySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewaySecret::None => f.write_str("None"),
            GatewaySecret::Token(_) => f.write_str("Token([REDACTED])"),
            GatewaySecret::Password(_) => f.write_str("Password([REDACTED])"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayOutcome {
    pub config: RuntimeConfig,
    pub port: u16,
    /// Token to hand to the daemon install, when token auth is active.
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Pure decisions
// ---------------------------------------------------------------------------

/// Run the bind/auth/exposure rules over `answers`. `existing_token` is
/// reused when token auth gets forced on.
pub fn reconcile_answers(
    answers: &GatewayAnswers,
    existing_token: Option<&str>,
    mint_token: impl FnOnce() -> String,
) -> Reconciled {
    reconcile(
        &GatewayProposal {
            bind: answers.bind,
            auth_mode: answers.auth_mode,
            exposure_mode: answers.exposure_mode,
            token: existing_token.map(str::to_string),
        },
        mint_token,
    )
}

/// Write the reconciled gateway settings into a copy of `config`.
///
/// Fails with [`WizardError::Invariant`] if the result would still break a
/// gateway rule, which means reconciliation itself is wrong.
pub fn apply(
    config: &RuntimeConfig,
    answers: &GatewayAnswers,
    reconciled: &Reconciled,
    secret: GatewaySecret,
) -> Result<RuntimeConfig, WizardError> {
    if let Err(violation) = check_invariants(
        reconciled.bind,
        reconciled.auth_mode,
        reconciled.exposure_mode,
    ) {
        tracing::error!(?reconciled, %violation, "reconciled gateway settings are inconsistent");
        return Err(violation.into());
    }

    let mut next = config.clone();
    let gateway = &mut next.gateway;
    gateway.mode = GatewayMode::Local;
    gateway.port = answers.port;
    gateway.bind = reconciled.bind;
    gateway.exposure.mode = reconciled.exposure_mode;
    gateway.exposure.reset_on_exit =
        reconciled.exposure_mode != ExposureMode::Off && answers.reset_on_exit;
    gateway.auth.mode = reconciled.auth_mode;
    match secret {
        GatewaySecret::Token(token) => gateway.auth.token = Some(token),
        GatewaySecret::Password(password) => gateway.auth.password = Some(password),
        GatewaySecret::None => {}
    }
    Ok(next)
}

/// Blank input means "generate one".
pub fn resolve_token_input(input: &str, mint_token: impl FnOnce() -> String) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        mint_token()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Prompt collector
// ---------------------------------------------------------------------------

pub fn collect(
    config: &RuntimeConfig,
    prompter: &mut dyn Prompter,
) -> Result<GatewayOutcome, WizardError> {
    let answers = ask(config, prompter)?;
    let existing_token = config.gateway.auth.token.as_deref();
    let reconciled = reconcile_answers(&answers, existing_token, token::random_token);
    for correction in &reconciled.corrections {
        prompter.note("Note", correction.message());
    }

    let secret = match reconciled.auth_mode {
        AuthMode::Off => GatewaySecret::None,
        AuthMode::Token => {
            let initial = reconciled
                .token
                .clone()
                .unwrap_or_else(token::random_token);
            let input = prompter.text(
                TextPrompt::new("Gateway token (blank to generate)").initial(initial),
            )?;
            GatewaySecret::Token(resolve_token_input(&input, token::random_token))
        }
        AuthMode::Password => {
            let input = prompter
                .text(TextPrompt::new("Gateway password").validate(validate_required))?;
            GatewaySecret::Password(input.trim().to_string())
        }
    };

    let token = match &secret {
        GatewaySecret::Token(token) => Some(token.clone()),
        _ => None,
    };
    let next = apply(config, &answers, &reconciled, secret)?;
    tracing::info!(
        port = answers.port,
        bind = %reconciled.bind,
        auth = %reconciled.auth_mode,
        exposure = %reconciled.exposure_mode,
        corrections = reconciled.corrections.len(),
        "gateway settings reconciled"
    );
    Ok(GatewayOutcome {
        config: next,
        port: answers.port,
        token,
    })
}

fn ask(config: &RuntimeConfig, prompter: &mut dyn Prompter) -> Result<GatewayAnswers, WizardError> {
    let port_raw = prompter.text(
        TextPrompt::new("Gateway port")
            .initial(config.gateway.port.to_string())
            .validate(validate_port),
    )?;
    let port = parse_port(&port_raw).map_err(WizardError::Prompt)?;

    let bind = prompter.select(
        "Gateway bind",
        &[
            Choice::new("loopback", "Loopback (127.0.0.1)"),
            Choice::new("lan", "LAN"),
            Choice::new("tailnet", "Tailnet"),
            Choice::new("auto", "Auto"),
        ],
        Some(config.gateway.bind.as_str()),
    )?;
    let auth = prompter.select(
        "Gateway auth",
        &[
            Choice::new("off", "Off (loopback only)"),
            Choice::new("token", "Token"),
            Choice::new("password", "Password"),
        ],
        Some(config.gateway.auth.mode.as_str()),
    )?;
    let exposure = prompter.select(
        "Tunnel exposure",
        &[
            Choice::new("off", "Off").hint("No tunnel exposure"),
            Choice::new("serve", "Serve").hint("Private HTTPS for your tailnet"),
            Choice::new("funnel", "Funnel").hint("Public HTTPS (internet)"),
        ],
        Some(config.gateway.exposure.mode.as_str()),
    )?;

    let bind: BindMode = bind.parse().map_err(WizardError::Prompt)?;
    let auth_mode: AuthMode = auth.parse().map_err(WizardError::Prompt)?;
    let exposure_mode: ExposureMode = exposure.parse().map_err(WizardError::Prompt)?;

    let mut reset_on_exit = false;
    if exposure_mode != ExposureMode::Off {
        prompter.note(
            "Tunnel",
            &format!("Docs:\n{}\n{}", docs::TAILSCALE, docs::WEB),
        );
        reset_on_exit = prompter.confirm("Reset tunnel serve/funnel on exit?", false)?;
    }

    Ok(GatewayAnswers {
        port,
        bind,
        auth_mode,
        exposure_mode,
        reset_on_exit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::prompt::{Answer, ScriptedPrompter};
    use gatehouse_core::Correction;

    fn answers(bind: BindMode, auth: AuthMode, exposure: ExposureMode) -> GatewayAnswers {
        GatewayAnswers {
            port: 18789,
            bind,
            auth_mode: auth,
            exposure_mode: exposure,
            reset_on_exit: true,
        }
    }

    #[test]
    fn lan_without_auth_gets_token() {
        let a = answers(BindMode::Lan, AuthMode::Off, ExposureMode::Off);
        let r = reconcile_answers(&a, None, || "minted".into());
        let next = apply(
            &RuntimeConfig::default(),
            &a,
            &r,
            GatewaySecret::Token("minted".into()),
        )
        .expect("apply");

        assert_eq!(next.gateway.bind, BindMode::Lan);
        assert_eq!(next.gateway.auth.mode, AuthMode::Token);
        assert_eq!(next.gateway.auth.token.as_deref(), Some("minted"));
        // Exposure off: the reset flag has nothing to reset.
        assert!(!next.gateway.exposure.reset_on_exit);
    }

    #[test]
    fn funnel_forces_loopback_and_password() {
        let a = answers(BindMode::Lan, AuthMode::Token, ExposureMode::Funnel);
        let r = reconcile_answers(&a, None, || unreachable!());
        assert_eq!(
            r.corrections,
            vec![
                Correction::BindForcedLoopback { from: BindMode::Lan },
                Correction::AuthForcedPassword { from: AuthMode::Token },
            ]
        );
        let next = apply(
            &RuntimeConfig::default(),
            &a,
            &r,
            GatewaySecret::Password("hunter2".into()),
        )
        .expect("apply");
        assert_eq!(next.gateway.bind, BindMode::Loopback);
        assert_eq!(next.gateway.auth.mode, AuthMode::Password);
        assert!(next.gateway.exposure.reset_on_exit);
    }

    #[test]
    fn unreconciled_input_is_an_invariant_error() {
        let a = answers(BindMode::Lan, AuthMode::Off, ExposureMode::Off);
        let bogus = Reconciled {
            bind: BindMode::Lan,
            auth_mode: AuthMode::Off,
            exposure_mode: ExposureMode::Off,
            token: None,
            corrections: vec![],
        };
        let err = apply(&RuntimeConfig::default(), &a, &bogus, GatewaySecret::None).unwrap_err();
        assert!(matches!(err, WizardError::Invariant(_)));
    }

    #[test]
    fn blank_token_input_generates() {
        assert_eq!(resolve_token_input("  ", || "gen".into()), "gen");
        assert_eq!(resolve_token_input(" mine ", || "gen".into()), "mine");
    }

    #[test]
    fn collector_shows_corrections_and_asks_for_password() {
        let mut prompter = ScriptedPrompter::new([
            Answer::Text("19000".into()),
            Answer::Select("lan".into()),
            Answer::Select("off".into()),
            Answer::Select("funnel".into()),
            Answer::Confirm(false),
            Answer::Text("s3cret".into()),
        ]);
        let out = collect(&RuntimeConfig::default(), &mut prompter).expect("collect");

        assert_eq!(out.port, 19000);
        assert_eq!(out.token, None);
        assert_eq!(out.config.gateway.auth.password.as_deref(), Some("s3cret"));
        assert!(prompter.noted("requires bind=loopback"));
        assert!(prompter.noted("requires password auth"));
        assert!(prompter.noted(docs::TAILSCALE));
        assert_eq!(prompter.asked.last().map(String::as_str), Some("Gateway password"));
    }
}
