//! Lifecycle call-sequence tests against a recording service manager.

use std::cell::RefCell;
use std::path::PathBuf;

use gatehouse_core::prompt::{Answer, ScriptedPrompter};
use gatehouse_core::ProcessEnv;
use gatehouse_daemon::{
    DaemonError, DaemonLifecycle, DaemonParams, GatewayRuntime, InstallRequest, LingerControl,
    LingerOutcome, ServiceManager, Step,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    IsLoaded,
    Install(Vec<String>),
    Uninstall,
    Restart,
}

struct RecordingService {
    loaded: bool,
    session_scoped: bool,
    fail_install: bool,
    calls: RefCell<Vec<Call>>,
    installed: RefCell<Option<InstallRequest>>,
}

impl RecordingService {
    fn new(loaded: bool, session_scoped: bool) -> Self {
        Self {
            loaded,
            session_scoped,
            fail_install: false,
            calls: RefCell::default(),
            installed: RefCell::default(),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn mutating_calls(&self) -> Vec<&'static str> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::IsLoaded => None,
                Call::Install(_) => Some("install"),
                Call::Uninstall => Some("uninstall"),
                Call::Restart => Some("restart"),
            })
            .collect()
    }
}

impl ServiceManager for RecordingService {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn definition_path(&self) -> PathBuf {
        PathBuf::from("/tmp/recording.service")
    }

    fn is_loaded(&self, _env: &ProcessEnv) -> Result<bool, DaemonError> {
        self.calls.borrow_mut().push(Call::IsLoaded);
        Ok(self.loaded)
    }

    fn install(&self, _env: &ProcessEnv, request: &InstallRequest) -> Result<(), DaemonError> {
        self.calls
            .borrow_mut()
            .push(Call::Install(request.program_arguments.clone()));
        if self.fail_install {
            return Err(DaemonError::ServiceManager {
                manager: "recording",
                message: "bootstrap failed".into(),
            });
        }
        *self.installed.borrow_mut() = Some(request.clone());
        Ok(())
    }

    fn uninstall(&self, _env: &ProcessEnv) -> Result<(), DaemonError> {
        self.calls.borrow_mut().push(Call::Uninstall);
        Ok(())
    }

    fn restart(&self, _env: &ProcessEnv) -> Result<(), DaemonError> {
        self.calls.borrow_mut().push(Call::Restart);
        Ok(())
    }

    fn session_scoped(&self) -> bool {
        self.session_scoped
    }
}

#[derive(Default)]
struct CountingLinger {
    checks: RefCell<u32>,
}

impl LingerControl for CountingLinger {
    fn is_enabled(&self, _user: &str, _env: &ProcessEnv) -> Result<bool, DaemonError> {
        *self.checks.borrow_mut() += 1;
        Ok(true)
    }

    fn enable(&self, _user: &str, _env: &ProcessEnv) -> Result<(), DaemonError> {
        Ok(())
    }
}

fn linux_env() -> ProcessEnv {
    ProcessEnv::from_pairs("linux", [("USER", "ada"), ("PATH", "/nonexistent")])
}

fn params(runtime: Option<GatewayRuntime>) -> DaemonParams {
    DaemonParams {
        port: 18789,
        token: Some("gw-token".into()),
        runtime,
        exe: PathBuf::from("/opt/gatehouse/bin/gatehouse"),
    }
}

#[test]
fn reinstall_calls_uninstall_then_install_never_restart() {
    let service = RecordingService::new(true, true);
    let linger = CountingLinger::default();
    let env = linux_env();
    let lifecycle = DaemonLifecycle {
        service: &service,
        linger: &linger,
        env: &env,
    };
    let mut prompter = ScriptedPrompter::new([Answer::Select("reinstall".into())]);

    let report = lifecycle
        .run_interactive(&params(Some(GatewayRuntime::Node)), &mut prompter)
        .expect("lifecycle");

    assert_eq!(service.mutating_calls(), vec!["uninstall", "install"]);
    assert_eq!(report.linger, Some(LingerOutcome::AlreadyEnabled));
    assert_eq!(*linger.checks.borrow(), 1);
}

#[test]
fn fresh_install_prompts_for_runtime_and_injects_token_privately() {
    let service = RecordingService::new(false, false);
    let linger = CountingLinger::default();
    let env = linux_env();
    let lifecycle = DaemonLifecycle {
        service: &service,
        linger: &linger,
        env: &env,
    };
    let mut prompter = ScriptedPrompter::new([Answer::Select("bun".into())]);

    let report = lifecycle
        .run_interactive(&params(None), &mut prompter)
        .expect("lifecycle");

    assert_eq!(report.runtime, Some(GatewayRuntime::Bun));
    assert_eq!(report.executed, vec![Step::Install, Step::CheckLinger]);
    let installed = service.installed.borrow().clone().expect("installed");
    assert_eq!(installed.program_arguments[0], "bun");
    assert_eq!(
        installed.environment.get("GATEHOUSE_GATEWAY_TOKEN").map(String::as_str),
        Some("gw-token")
    );
    assert!(std::env::var("GATEHOUSE_GATEWAY_TOKEN").map_or(true, |v| v != "gw-token"));
    // Not session scoped: no linger query.
    assert_eq!(report.linger, None);
    assert_eq!(*linger.checks.borrow(), 0);
}

#[test]
fn restart_keeps_registration_and_checks_linger() {
    let service = RecordingService::new(true, true);
    let linger = CountingLinger::default();
    let env = linux_env();
    let lifecycle = DaemonLifecycle {
        service: &service,
        linger: &linger,
        env: &env,
    };
    let mut prompter = ScriptedPrompter::new([Answer::Select("restart".into())]);

    lifecycle
        .run_interactive(&params(None), &mut prompter)
        .expect("lifecycle");

    assert_eq!(service.mutating_calls(), vec!["restart"]);
    assert_eq!(*linger.checks.borrow(), 1);
    assert_eq!(prompter.remaining(), 0);
}

#[test]
fn skip_does_nothing_including_linger() {
    let service = RecordingService::new(true, true);
    let linger = CountingLinger::default();
    let env = linux_env();
    let lifecycle = DaemonLifecycle {
        service: &service,
        linger: &linger,
        env: &env,
    };
    let mut prompter = ScriptedPrompter::new([Answer::Select("skip".into())]);

    let report = lifecycle
        .run_interactive(&params(None), &mut prompter)
        .expect("lifecycle");

    assert!(report.skipped());
    assert_eq!(service.calls(), vec![Call::IsLoaded]);
    assert_eq!(*linger.checks.borrow(), 0);
}

#[test]
fn install_failure_surfaces_and_stops() {
    let mut service = RecordingService::new(false, true);
    service.fail_install = true;
    let linger = CountingLinger::default();
    let env = linux_env();
    let lifecycle = DaemonLifecycle {
        service: &service,
        linger: &linger,
        env: &env,
    };
    let mut prompter = ScriptedPrompter::default();

    let err = lifecycle
        .run_interactive(&params(Some(GatewayRuntime::Node)), &mut prompter)
        .unwrap_err();

    assert!(matches!(err, DaemonError::ServiceManager { .. }));
    assert_eq!(*linger.checks.borrow(), 0);
}

#[test]
fn cancelled_choice_unwinds_without_calls() {
    let service = RecordingService::new(true, true);
    let linger = CountingLinger::default();
    let env = linux_env();
    let lifecycle = DaemonLifecycle {
        service: &service,
        linger: &linger,
        env: &env,
    };
    let mut prompter = ScriptedPrompter::new([Answer::Cancel]);

    let err = lifecycle
        .run_interactive(&params(None), &mut prompter)
        .unwrap_err();
    assert!(matches!(err, DaemonError::Cancelled));
    assert!(service.mutating_calls().is_empty());
}
