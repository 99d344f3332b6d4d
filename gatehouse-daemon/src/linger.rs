//! systemd session lingering.
//!
//! User units are stopped when the owning user's last session ends unless
//! lingering is enabled for that user.

use gatehouse_core::{docs, ProcessEnv, Prompter};

use crate::error::DaemonError;
use crate::service::{run_checked, run_command};

pub trait LingerControl {
    fn is_enabled(&self, user: &str, env: &ProcessEnv) -> Result<bool, DaemonError>;

    fn enable(&self, user: &str, env: &ProcessEnv) -> Result<(), DaemonError>;
}

/// `loginctl`-backed control; enabling goes through `sudo` unless root.
#[derive(Debug, Default, Clone, Copy)]
pub struct Loginctl;

impl LingerControl for Loginctl {
    fn is_enabled(&self, user: &str, env: &ProcessEnv) -> Result<bool, DaemonError> {
        let output = run_command(
            "loginctl",
            &["show-user", user, "--property=Linger", "--value"],
            env,
        )?;
        Ok(output.status.success()
            && String::from_utf8_lossy(&output.stdout)
                .trim()
                .eq_ignore_ascii_case("yes"))
    }

    fn enable(&self, user: &str, env: &ProcessEnv) -> Result<(), DaemonError> {
        if env.is_root() {
            run_checked("loginctl", "loginctl", &["enable-linger", user], env, false)
        } else {
            run_checked("loginctl", "sudo", &["loginctl", "enable-linger", user], env, false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LingerOutcome {
    /// Platform has no session-scoped service manager.
    NotApplicable,
    AlreadyEnabled,
    Enabled,
    Declined,
}

/// Make sure the gateway outlives the login session, asking first.
pub fn ensure_linger(
    control: &dyn LingerControl,
    env: &ProcessEnv,
    prompter: &mut dyn Prompter,
) -> Result<LingerOutcome, DaemonError> {
    if !env.is_linux() {
        return Ok(LingerOutcome::NotApplicable);
    }
    let Some(user) = env.user() else {
        tracing::warn!("cannot determine login user; skipping linger check");
        return Ok(LingerOutcome::NotApplicable);
    };

    if control.is_enabled(user, env)? {
        return Ok(LingerOutcome::AlreadyEnabled);
    }

    prompter.note(
        "systemd",
        &format!(
            "Linux installs use a systemd user service. Without lingering, systemd stops \
             the user session on logout/idle and kills the Gateway.\nDocs: {}",
            docs::LINGER
        ),
    );
    let sudo_hint = if env.is_root() { "" } else { " (may require sudo)" };
    let consent = prompter.confirm(
        &format!("Enable systemd lingering for {user}?{sudo_hint}"),
        true,
    )?;
    if !consent {
        prompter.note(
            "systemd",
            &format!("Without lingering, the Gateway will stop when you log out.\nRun: sudo loginctl enable-linger {user}"),
        );
        return Ok(LingerOutcome::Declined);
    }

    control.enable(user, env)?;
    prompter.log(&format!("Enabled systemd lingering for {user}."));
    tracing::info!(user, "systemd lingering enabled");
    Ok(LingerOutcome::Enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::prompt::{Answer, ScriptedPrompter};
    use std::cell::RefCell;

    struct FakeLinger {
        enabled: bool,
        enable_calls: RefCell<Vec<String>>,
    }

    impl FakeLinger {
        fn new(enabled: bool) -> Self {
            Self {
                enabled,
                enable_calls: RefCell::default(),
            }
        }
    }

    impl LingerControl for FakeLinger {
        fn is_enabled(&self, _user: &str, _env: &ProcessEnv) -> Result<bool, DaemonError> {
            Ok(self.enabled)
        }

        fn enable(&self, user: &str, _env: &ProcessEnv) -> Result<(), DaemonError> {
            self.enable_calls.borrow_mut().push(user.to_string());
            Ok(())
        }
    }

    fn linux() -> ProcessEnv {
        ProcessEnv::from_pairs("linux", [("USER", "ada")])
    }

    #[test]
    fn macos_skips_entirely() {
        let linger = FakeLinger::new(false);
        let mut prompter = ScriptedPrompter::default();
        let env = ProcessEnv::from_pairs("macos", [("USER", "ada")]);
        let outcome = ensure_linger(&linger, &env, &mut prompter).expect("linger");
        assert_eq!(outcome, LingerOutcome::NotApplicable);
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn already_enabled_asks_nothing() {
        let linger = FakeLinger::new(true);
        let mut prompter = ScriptedPrompter::default();
        let outcome = ensure_linger(&linger, &linux(), &mut prompter).expect("linger");
        assert_eq!(outcome, LingerOutcome::AlreadyEnabled);
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn consent_explains_then_enables() {
        let linger = FakeLinger::new(false);
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(true)]);
        let outcome = ensure_linger(&linger, &linux(), &mut prompter).expect("linger");
        assert_eq!(outcome, LingerOutcome::Enabled);
        assert!(prompter.noted("kills the Gateway"));
        assert!(prompter.asked[0].contains("may require sudo"));
        assert_eq!(*linger.enable_calls.borrow(), vec!["ada".to_string()]);
    }

    #[test]
    fn declining_leaves_linger_off() {
        let linger = FakeLinger::new(false);
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(false)]);
        let outcome = ensure_linger(&linger, &linux(), &mut prompter).expect("linger");
        assert_eq!(outcome, LingerOutcome::Declined);
        assert!(linger.enable_calls.borrow().is_empty());
    }
}
