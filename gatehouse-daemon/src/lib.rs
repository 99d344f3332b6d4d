//! Gateway service lifecycle: launchd / systemd user units, linger check,
//! launch command assembly and the post-install health probe.

mod error;
pub mod health;
pub mod launch;
pub mod launchd;
pub mod lifecycle;
pub mod linger;
pub mod paths;
pub mod service;
pub mod systemd;

pub use error::DaemonError;
pub use health::{GatewayProbe, HealthStatus};
pub use launch::{build_install_request, GatewayRuntime, LaunchSpec};
pub use launchd::LaunchdService;
pub use lifecycle::{plan, DaemonLifecycle, DaemonParams, DaemonReport, ExistingServiceAction, Step};
pub use linger::{ensure_linger, LingerControl, LingerOutcome, Loginctl};
pub use service::{resolve_service, InstallRequest, ServiceManager};
pub use systemd::SystemdUserService;
